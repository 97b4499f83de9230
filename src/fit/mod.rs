//! # 峰拟合模块
//!
//! 背景 + Lorentzian 峰的复合模型、带边界的 Levenberg-Marquardt 求解器，
//! 以及 Raman/XRD 共用的单文件拟合流程。
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 使用
//! - 使用 `parsers/`, `models/`, `report/`
//! - 子模块:
//!   - preprocess (平滑、归一化)
//!   - lineshape (峰形与背景)
//!   - model (复合模型)
//!   - solver (LM 求解器)
//!   - result (拟合结果与统计量)
//!   - engine (拟合入口)
//!   - target (光谱类型能力接口)
//!   - pipeline (完整流程)

pub mod engine;
pub mod lineshape;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod result;
pub mod solver;
pub mod target;

pub use pipeline::{run_pipeline, PipelineOptions};
pub use target::{FitTarget, RamanTarget, XrdTarget};
