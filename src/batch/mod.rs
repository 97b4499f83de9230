//! # 批量处理模块
//!
//! ## 功能
//! - 展开输入目录，收集待拟合文件
//! - 顺序处理多个文件，汇总成功与失败
//! - 读取参数文件，按 (样品, 峰) 汇总结果
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs`, `commands/aggregate.rs` 使用
//! - 使用 `indicatif` 显示进度
//! - 子模块: collector, runner, table

pub mod collector;
pub mod runner;
pub mod table;

pub use collector::FileCollector;
pub use runner::{BatchRunner, ProcessResult};
pub use table::{PeakStatistics, SampleTable};
