//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `fit`: 峰拟合（嵌套子命令）
//!   - `raman`: Raman 光谱
//!   - `xrd`: XRD 衍射谱
//! - `aggregate`: 汇总多个样品的拟合结果
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: fit, aggregate

pub mod aggregate;
pub mod fit;

use clap::{Parser, Subcommand};

/// ramanfit - Raman/XRD 光谱 Lorentzian 峰拟合工具
#[derive(Parser)]
#[command(name = "ramanfit")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Lorentzian peak fitting for Raman and XRD spectra", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, default_value_t = false, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// 日志过滤级别，`RUST_LOG` 优先
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Fit background + Lorentzian peaks to spectra
    Fit(fit::FitArgs),

    /// Aggregate fitted parameters across samples (statistics, D/G ratio, La)
    Aggregate(aggregate::AggregateArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fit_command() {
        let cli = Cli::parse_from([
            "ramanfit", "fit", "xrd", "a.xy", "b.xy", "--peaks", "p.ini", "--no-plot",
        ]);
        let Commands::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let fit::FitCommands::Xrd(args) = args.command else {
            panic!("expected xrd");
        };
        assert_eq!(args.input.len(), 2);
        assert!(args.no_plot);
        assert_eq!(args.pattern, "*.txt");
        assert_eq!(args.output_dir, std::path::PathBuf::from("out_report"));
    }

    #[test]
    fn test_parse_raman_reader_flags() {
        let cli = Cli::parse_from([
            "ramanfit", "fit", "raman", "a.txt", "--normalize-max", "--detrend",
        ]);
        let Commands::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let fit::FitCommands::Raman(args) = args.command else {
            panic!("expected raman");
        };
        assert!(args.detrend && args.common.normalize_max);
        assert!(Cli::try_parse_from(["ramanfit", "fit", "xrd", "a.xy", "--detrend"]).is_err());
    }

    #[test]
    fn test_parse_aggregate_command() {
        let cli = Cli::parse_from([
            "ramanfit",
            "-v",
            "aggregate",
            "s1",
            "s2",
            "--peak-names",
            "D,G",
            "--ratios",
        ]);
        assert_eq!(cli.log_level(), "debug");
        let Commands::Aggregate(args) = cli.command else {
            panic!("expected aggregate");
        };
        assert_eq!(args.peak_names, Some(vec!["D".to_string(), "G".to_string()]));
        assert_eq!(args.wavelength, 532.0);
        assert!(args.ratios && !args.positions);
    }
}
