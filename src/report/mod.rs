//! # 结果输出模块
//!
//! ## 依赖关系
//! - 被 `fit/pipeline.rs`, `commands/` 使用
//! - 子模块: text (拟合报告), params (参数文件), plot (拟合图), summary (汇总文件)

pub mod params;
pub mod plot;
pub mod summary;
pub mod text;

pub use plot::PlotStyle;
