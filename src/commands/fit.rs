//! # fit 子命令实现
//!
//! 展开输入（文件/目录），对每个测量文件依次运行拟合流程。
//! 单个文件失败时记录错误并继续处理其余文件。
//!
//! ## 依赖关系
//! - 使用 `cli/fit.rs` 定义的 FitArgs
//! - 使用 `batch/` 收集文件并顺序执行
//! - 使用 `fit/pipeline.rs` 处理单个文件

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::fit::{FitArgs, FitCommands, FitSpectrumArgs};
use crate::error::{RamanfitError, Result};
use crate::fit::{run_pipeline, FitTarget, PipelineOptions, RamanTarget, XrdTarget};
use crate::parsers::raman::RamanReadOptions;
use crate::report::PlotStyle;
use crate::utils::output;

use std::path::{Path, PathBuf};

/// 执行拟合命令
pub fn execute(args: FitArgs) -> Result<()> {
    let (target, args) = build_target(args.command);
    let kind = target.kind();
    output::print_header(&format!("{} Lorentzian Peak Fitting", kind));

    let files = collect_inputs(&args)?;
    if files.is_empty() {
        return Err(RamanfitError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }

    match &args.peaks {
        Some(path) => output::print_info(&format!("Peaks file: '{}'", path.display())),
        None => output::print_info(&format!("Using the bundled {} peaks", kind)),
    }
    output::print_info(&format!("Found {} spectra", files.len()));

    let options = pipeline_options(&args);

    if files.len() == 1 {
        return match process_file(target.as_ref(), &files[0], &options) {
            ProcessResult::Success(msg) => {
                output::print_success(&msg);
                Ok(())
            }
            ProcessResult::NotConverged(path, msg) => {
                output::print_warning(&format!("{}: fit did not converge ({})", path, msg));
                Ok(())
            }
            ProcessResult::Failed(_, err) => Err(RamanfitError::Other(err)),
        };
    }

    let runner = BatchRunner::new(true);
    let result = runner.run(&files, |file| process_file(target.as_ref(), file, &options));

    output::print_separator();
    output::print_done(&format!(
        "Batch complete: {} spectra, {} fitted, {} not converged, {} failed",
        result.total(),
        result.success,
        result.not_converged,
        result.failed
    ));

    for (path, msg) in &result.warnings {
        output::print_warning(&format!("  {}: {}", path, msg));
    }

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 由子命令构造光谱类型及其读取选项
fn build_target(command: FitCommands) -> (Box<dyn FitTarget>, FitSpectrumArgs) {
    match command {
        FitCommands::Raman(raman) => {
            let read = RamanReadOptions {
                normalize: raman.common.normalize_max,
                remove_offset: raman.detrend,
            };
            (Box::new(RamanTarget { read }), raman.common)
        }
        FitCommands::Xrd(args) => {
            let target = XrdTarget {
                normalize: args.normalize_max,
            };
            (Box::new(target), args)
        }
    }
}

/// 展开所有输入路径
fn collect_inputs(args: &FitSpectrumArgs) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in &args.input {
        let collector = FileCollector::new(input.clone())
            .with_pattern(&args.pattern)?
            .recursive(args.recursive);
        files.extend(collector.collect()?);
    }
    Ok(files)
}

fn pipeline_options(args: &FitSpectrumArgs) -> PipelineOptions {
    let plot = (!args.no_plot).then(|| PlotStyle {
        width: args.width,
        height: args.height,
        svg: args.svg,
        ..PlotStyle::default()
    });

    PipelineOptions {
        peaks_file: args.peaks.clone(),
        output_dir: args.output_dir.clone(),
        smooth: !args.no_smooth,
        normalize: !args.no_normalize,
        plot,
    }
}

/// 处理单个文件
fn process_file(target: &dyn FitTarget, input: &Path, options: &PipelineOptions) -> ProcessResult {
    match run_pipeline(target, input, options) {
        Ok(out) if out.result.success => ProcessResult::Success(format!(
            "{} -> {} (R² = {:.4})",
            input.display(),
            out.params_path.display(),
            out.result.statistics.rsquared
        )),
        Ok(out) => ProcessResult::NotConverged(input.display().to_string(), out.result.message),
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}
