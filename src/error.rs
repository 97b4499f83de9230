//! # 统一错误处理模块
//!
//! 定义 ramanfit 的所有错误类型，使用 `thiserror` 派生。
//!
//! 配置层面的问题（缺失的可选键、损坏的峰列表、未知背景类型）不会走到这里，
//! 它们在读取时记录日志并替换为默认值；这里只收录会中断流程的结构性错误。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// ramanfit 统一错误类型
#[derive(Error, Debug)]
pub enum RamanfitError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Key '{key}' not found in {path}")]
    MissingKey { key: String, path: String },

    #[error("Invalid value for '{key}' in {path}: '{value}'")]
    InvalidValue {
        key: String,
        path: String,
        value: String,
    },

    // ─────────────────────────────────────────────────────────────
    // 数值计算错误
    // ─────────────────────────────────────────────────────────────
    #[error("Savitzky-Golay filter: {0}")]
    Smoothing(String),

    #[error("Duplicate model parameter: {0}")]
    DuplicateParameter(String),

    #[error("Model has no data points to fit")]
    EmptySpectrum,

    // ─────────────────────────────────────────────────────────────
    // 汇总错误
    // ─────────────────────────────────────────────────────────────
    #[error("Peak '{peak}' not found for sample '{sample}'")]
    MissingPeak { sample: String, peak: String },

    // ─────────────────────────────────────────────────────────────
    // 输出错误
    // ─────────────────────────────────────────────────────────────
    #[error("Plot rendering failed: {0}")]
    PlotError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, RamanfitError>;
