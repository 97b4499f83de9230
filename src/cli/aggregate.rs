//! # aggregate 子命令 CLI 定义
//!
//! 汇总多个样品的参数文件：结果表、统计量、D/G 强度比与晶粒尺寸。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/aggregate.rs`

use crate::batch::table::DEFAULT_WAVELENGTH;

use clap::Args;
use std::path::PathBuf;

/// aggregate 命令参数
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Sample base paths, without the `_params.txt` suffix
    pub bases: Vec<PathBuf>,

    /// Collect every parameter file in this directory instead of listing bases
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Glob pattern for parameter files (with --dir)
    #[arg(long, default_value = "*_params.txt")]
    pub pattern: String,

    /// Ordered peak names, comma separated (e.g., "D,G"). Defaults to a, b, c, ...
    #[arg(long, value_delimiter = ',')]
    pub peak_names: Option<Vec<String>>,

    /// Sample names, comma separated, in the same order as the bases
    #[arg(long, value_delimiter = ',')]
    pub sample_names: Option<Vec<String>>,

    /// Output directory for the summary files
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Add x/y/z positions read from each `{base}.txt` header
    #[arg(long, default_value_t = false)]
    pub positions: bool,

    /// Compute D/G intensity ratios and crystallite sizes (needs peaks named D and G)
    #[arg(long, default_value_t = false)]
    pub ratios: bool,

    /// Laser wavelength in nm for the crystallite size
    #[arg(long, default_value_t = DEFAULT_WAVELENGTH)]
    pub wavelength: f64,
}
