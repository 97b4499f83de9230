//! # 单文件拟合流程
//!
//! 所有光谱类型共用的步骤：
//! ```text
//! 峰配置 → 读取光谱 → 平滑 → 归一化 → 峰约束 → 构建模型 → 拟合 → 绘图 → 保存
//! ```
//!
//! 流程本身遇错即停；拟合未收敛不算错误，照常输出报告。
//!
//! ## 输出文件（`{stem}` 为去掉扩展名的输入路径）
//! - `{output_dir}/{name}_report`：文本报告
//! - `{stem}_params.txt`：参数文件
//! - `{stem}.png`（或 `.svg`）：拟合图
//!
//! ## 依赖关系
//! - 被 `commands/fit.rs` 调用
//! - 使用 `parsers/config.rs`, `fit/`, `report/`

use crate::error::{RamanfitError, Result};
use crate::fit::engine::fit_model;
use crate::fit::lineshape::Background;
use crate::fit::model::CompositeModel;
use crate::fit::preprocess::{normalize_min_max, savgol_filter};
use crate::fit::result::FitResult;
use crate::fit::target::FitTarget;
use crate::parsers::config::{parse_fit_options, read_other_data, read_peaks_config};
use crate::report::params::{write_params_dump, PARAMS_SUFFIX};
use crate::report::plot::{generate_fit_plot, FitPlot, PlotStyle};
use crate::report::text::write_fit_report;

use std::fs;
use std::path::{Path, PathBuf};

/// 默认报告目录
pub const DEFAULT_OUTPUT_DIR: &str = "out_report";

/// 流程选项
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// 峰配置文件，None 时使用内置默认值
    pub peaks_file: Option<PathBuf>,
    /// 文本报告目录
    pub output_dir: PathBuf,
    pub smooth: bool,
    pub normalize: bool,
    /// None 时不绘图
    pub plot: Option<PlotStyle>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            peaks_file: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            smooth: true,
            normalize: true,
            plot: Some(PlotStyle::default()),
        }
    }
}

/// 流程输出
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub result: FitResult,
    pub report_path: PathBuf,
    pub params_path: PathBuf,
    pub plot_path: Option<PathBuf>,
}

/// 对单个测量文件运行完整拟合流程
pub fn run_pipeline(
    target: &dyn FitTarget,
    input: &Path,
    options: &PipelineOptions,
) -> Result<PipelineOutput> {
    fs::create_dir_all(&options.output_dir).map_err(|e| RamanfitError::FileWriteError {
        path: options.output_dir.display().to_string(),
        source: e,
    })?;

    let peaks_file = options.peaks_file.as_deref();
    let peaks = read_peaks_config(peaks_file, target.kind());
    let other_data = read_other_data(peaks_file);
    let fit_options = parse_fit_options(other_data.as_ref());

    let mut spectrum = target.load_spectrum(input)?;
    if spectrum.is_empty() {
        return Err(RamanfitError::EmptySpectrum);
    }
    log::debug!("Loaded {} points from {}", spectrum.len(), input.display());

    if options.smooth {
        let smoothing = fit_options.smoothing();
        spectrum.y = savgol_filter(&spectrum.y, smoothing.window_size, smoothing.poly_order)?;
    }
    if options.normalize {
        spectrum.y = normalize_min_max(&spectrum.y);
    }

    let tolerances = target.default_tolerances(&fit_options);
    let background = Background::from_name(&fit_options.poly_type());
    let model = CompositeModel::build(background, &peaks, &tolerances)?;
    let result = fit_model(&model, &spectrum.x, &spectrum.y)?;

    let stem = spectrum.stem();
    let plot_path = match &options.plot {
        Some(style) => {
            let path = stem.with_extension(style.extension());
            let (x_label, y_label) = target.axis_labels();
            let plot = FitPlot {
                x: &spectrum.x,
                y: &spectrum.y,
                best_fit: &result.best_fit,
                components: &result.components,
                x_label,
                y_label,
            };
            generate_fit_plot(&plot, &path, style)?;
            Some(path)
        }
        None => None,
    };

    let report_path = options
        .output_dir
        .join(format!("{}_report", spectrum.name()));
    write_fit_report(&result, &report_path)?;

    let params_path = PathBuf::from(format!("{}{}", stem.display(), PARAMS_SUFFIX));
    write_params_dump(&result.params, &params_path)?;

    Ok(PipelineOutput {
        result,
        report_path,
        params_path,
        plot_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::lineshape::lorentzian;
    use crate::fit::target::{RamanTarget, XrdTarget};
    use crate::parsers::params::ParameterDump;
    use std::fmt::Write as _;

    fn write_raman(path: &Path) {
        let mut content = String::from("#Laser=532\n#X (µm)=\t1.5\n");
        for i in 0..600 {
            let x = 1000.0 + i as f64;
            let y = 200.0
                + lorentzian(x, 8000.0, 1352.0, 40.0)
                + lorentzian(x, 9000.0, 1588.0, 25.0);
            writeln!(content, "{}\t{}", x, y).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_raman_pipeline_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("carbon.txt");
        write_raman(&input);

        let options = PipelineOptions {
            output_dir: dir.path().join("out_report"),
            plot: None,
            ..Default::default()
        };
        let output = run_pipeline(&RamanTarget::default(), &input, &options).unwrap();

        assert_eq!(output.report_path, dir.path().join("out_report").join("carbon_report"));
        assert_eq!(output.params_path, dir.path().join("carbon_params.txt"));
        assert!(output.report_path.exists());

        let dump = ParameterDump::read(&output.params_path).unwrap();
        assert_eq!(dump.peak_count(), 2);
        let d_center = dump.value("lz1center").unwrap();
        let g_center = dump.value("lz2center").unwrap();
        assert!((d_center - 1352.0).abs() < 1.0, "D at {}", d_center);
        assert!((g_center - 1588.0).abs() < 1.0, "G at {}", g_center);
        assert!(dump.value("bkga").is_ok());
    }

    #[test]
    fn test_peaks_file_options_applied() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("carbon.txt");
        write_raman(&input);
        let peaks = dir.path().join("peaks.ini");
        fs::write(
            &peaks,
            "peaks = 1590, 1350\n[other data]\npoly_type = linear\nwindow_size = 11\n",
        )
        .unwrap();

        let options = PipelineOptions {
            peaks_file: Some(peaks),
            output_dir: dir.path().join("reports"),
            plot: None,
            ..Default::default()
        };
        let output = run_pipeline(&RamanTarget::default(), &input, &options).unwrap();
        assert!(output.result.params.get("bkgslope").is_some());
        let center = output.result.params.get("lz1center").unwrap();
        assert_eq!((center.min, center.max), (1340.0, 1360.0));
    }

    #[test]
    fn test_reversed_and_nan_ranges_still_fit() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("carbon.txt");
        write_raman(&input);
        let peaks = dir.path().join("peaks.ini");
        fs::write(
            &peaks,
            "peaks = 1350, 1590\n[other data]\nmin_max_amplitude = 200, 0\n\
             min_max_sigma = nan, 10\npeak_center_tolerance = -5\n",
        )
        .unwrap();

        let options = PipelineOptions {
            peaks_file: Some(peaks),
            output_dir: dir.path().join("reports"),
            plot: None,
            ..Default::default()
        };
        let output = run_pipeline(&RamanTarget::default(), &input, &options).unwrap();
        for param in output.result.params.iter() {
            assert!(param.min <= param.max, "{} has [{}, {}]", param.name, param.min, param.max);
        }
        let center = output.result.params.get("lz1center").unwrap();
        assert_eq!((center.min, center.max), (1340.0, 1360.0));
    }

    #[test]
    fn test_invalid_window_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("short.xy");
        fs::write(&input, "angle counts\n20 1\n21 2\n22 3\n").unwrap();

        let options = PipelineOptions {
            output_dir: dir.path().join("reports"),
            plot: None,
            ..Default::default()
        };
        let err = run_pipeline(&XrdTarget::default(), &input, &options);
        assert!(matches!(err, Err(RamanfitError::Smoothing(_))));
    }
}
