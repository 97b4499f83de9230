//! # 数据模型模块
//!
//! 定义光谱、拟合选项与拟合参数的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`fit/` 和 `commands/` 使用
//! - 子模块: spectrum, options, parameters

pub mod options;
pub mod parameters;
pub mod spectrum;

pub use options::{FitOptions, Tolerances};
pub use parameters::{Parameter, Parameters};
pub use spectrum::{Metadata, Spectrum, SpectrumKind};
