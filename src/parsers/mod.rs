//! # 解析器模块
//!
//! 提供测量文件、峰配置文件和参数文件的解析器。
//!
//! ## 依赖关系
//! - 被 `fit/`、`batch/` 和 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: config, header, params, raman, xrd

pub mod config;
pub mod header;
pub mod params;
pub mod raman;
pub mod xrd;
