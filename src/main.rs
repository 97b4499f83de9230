//! # ramanfit - Raman/XRD 光谱峰拟合工具
//!
//! 对测量光谱拟合 "多项式背景 + 多个 Lorentzian 峰" 的复合模型，
//! 写出拟合报告、参数文件和图像，并可汇总多个样品的结果。
//!
//! ## 子命令
//! - `fit` - 峰拟合
//!   - `raman` - Raman 光谱
//!   - `xrd` - XRD 衍射谱
//! - `aggregate` - 汇总参数文件（统计量、D/G 强度比、晶粒尺寸）
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── fit/       (模型、求解器、拟合流程)
//!   │     ├── batch/     (文件收集、批量执行、结果汇总)
//!   │     ├── report/    (报告、参数文件、图像)
//!   │     ├── parsers/   (光谱与配置文件解析)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod fit;
mod models;
mod parsers;
mod report;
mod utils;

use clap::Parser;
use cli::Cli;
use env_logger::Env;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .init();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
