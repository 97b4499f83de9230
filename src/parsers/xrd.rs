//! # XRD 测量文件解析器
//!
//! ## 格式说明
//! ```text
//! 2Theta Intensity            <- 第一行跳过
//! 10.00  152
//! 10.02  149   # 注释
//! ...
//! ```
//! 空白分隔两列（角度、强度），没有结构化头部，元数据只保留文件名。
//!
//! ## 依赖关系
//! - 被 `fit/target.rs` 使用
//! - 使用 `fit/preprocess.rs` 进行可选的归一化

use crate::error::{RamanfitError, Result};
use crate::fit::preprocess;
use crate::models::spectrum::output_stem;
use crate::models::{Metadata, Spectrum};

use std::fs;
use std::path::Path;

/// 解析 XRD 文件
pub fn read_xrd_file(path: &Path, normalize: bool) -> Result<Spectrum> {
    let bytes = fs::read(path).map_err(|e| RamanfitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let content = String::from_utf8_lossy(&bytes);

    let (x, mut y) = parse_xrd_columns(&content, &path.display().to_string())?;
    if normalize {
        y = preprocess::normalize_to_max(&y);
    }

    let base_name = output_stem(path).display().to_string();
    Ok(Spectrum::new(path, x, y, Metadata::BaseName(base_name)))
}

/// 解析空白分隔的数据列（跳过第一行）
pub fn parse_xrd_columns(content: &str, source: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut x = Vec::new();
    let mut y = Vec::new();

    for (lineno, line) in content.lines().enumerate().skip(1) {
        let data = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };

        let fields: Vec<&str> = data.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 2 {
            return Err(RamanfitError::ParseError {
                format: "XRD".to_string(),
                path: source.to_string(),
                reason: format!("line {}: expected two columns", lineno + 1),
            });
        }

        let parse = |field: &str| {
            field.parse::<f64>().map_err(|_| RamanfitError::ParseError {
                format: "XRD".to_string(),
                path: source.to_string(),
                reason: format!("line {}: invalid number '{}'", lineno + 1, field),
            })
        };

        x.push(parse(fields[0])?);
        y.push(parse(fields[1])?);
    }

    Ok((x, y))
}
