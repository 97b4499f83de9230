//! # fit 子命令 CLI 定义
//!
//! 对 Raman 或 XRD 测量文件拟合背景 + Lorentzian 峰：
//! - `raman`: Raman 光谱（制表符分隔，`#` 头部）
//! - `xrd`: X 射线衍射谱（空白分隔，首行跳过）
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/fit.rs`

use crate::fit::pipeline::DEFAULT_OUTPUT_DIR;

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// fit 主命令参数
#[derive(Args, Debug)]
pub struct FitArgs {
    #[command(subcommand)]
    pub command: FitCommands,
}

/// fit 子命令
#[derive(Subcommand, Debug)]
pub enum FitCommands {
    /// Fit Raman spectra (tab-separated wavenumber/intensity)
    Raman(RamanFitArgs),

    /// Fit X-ray diffraction patterns (whitespace-separated angle/intensity)
    Xrd(FitSpectrumArgs),
}

/// Raman 拟合参数：通用参数加 Raman 独有的读取选项
#[derive(Args, Debug, Clone)]
pub struct RamanFitArgs {
    #[command(flatten)]
    pub common: FitSpectrumArgs,

    /// Subtract a least-squares line from the intensities right after reading
    #[arg(long, default_value_t = false)]
    pub detrend: bool,
}

/// 单个光谱类型的拟合参数
#[derive(Args, Debug, Clone)]
pub struct FitSpectrumArgs {
    /// Measurement files or directories to fit
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Peaks file (`peaks = ...` plus optional [other data] section).
    /// Falls back to the bundled linear-carbon defaults
    #[arg(short, long)]
    pub peaks: Option<PathBuf>,

    /// Directory for the text fit reports
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    // ─────────────────────────────────────────────────────────────
    // 预处理
    // ─────────────────────────────────────────────────────────────
    /// Divide intensities by their maximum right after reading
    #[arg(long, default_value_t = false)]
    pub normalize_max: bool,

    /// Skip Savitzky-Golay smoothing
    #[arg(long, default_value_t = false)]
    pub no_smooth: bool,

    /// Skip min-max normalization
    #[arg(long, default_value_t = false)]
    pub no_normalize: bool,

    // ─────────────────────────────────────────────────────────────
    // 图表参数
    // ─────────────────────────────────────────────────────────────
    /// Skip plot generation
    #[arg(long, default_value_t = false)]
    pub no_plot: bool,

    /// Write the plot as SVG instead of PNG
    #[arg(long, default_value_t = false)]
    pub svg: bool,

    /// Figure width in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Figure height in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    // ─────────────────────────────────────────────────────────────
    // 批量处理参数
    // ─────────────────────────────────────────────────────────────
    /// Glob pattern for files inside directory inputs (e.g., "*.txt,*.xy")
    #[arg(long, default_value = "*.txt")]
    pub pattern: String,

    /// Recurse into subdirectories
    #[arg(long, default_value_t = false)]
    pub recursive: bool,
}
