//! # 拟合引擎
//!
//! 对 (x, y) 运行带边界的非线性最小二乘，然后分别求值每个组件。
//!
//! 收敛失败不是错误：结果中的 `success` 和 `message` 记录状态，
//! 调用者照常生成报告。
//!
//! ## 依赖关系
//! - 被 `fit/pipeline.rs` 使用
//! - 使用 `fit/model.rs`, `fit/solver.rs`, `fit/result.rs`

use crate::error::{RamanfitError, Result};
use crate::fit::model::CompositeModel;
use crate::fit::result::{apply_covariance, correlations, FitResult, FitStatistics, MIN_CORRELATION};
use crate::fit::solver::{minimize, SolverOptions};

/// 拟合复合模型
pub fn fit_model(model: &CompositeModel, x: &[f64], y: &[f64]) -> Result<FitResult> {
    fit_model_with(model, x, y, &SolverOptions::default())
}

/// 使用指定求解器选项拟合
pub fn fit_model_with(
    model: &CompositeModel,
    x: &[f64],
    y: &[f64],
    options: &SolverOptions,
) -> Result<FitResult> {
    if x.is_empty() {
        return Err(RamanfitError::EmptySpectrum);
    }
    if x.len() != y.len() {
        return Err(RamanfitError::InvalidArgument(format!(
            "x and y lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }

    let initial = model.params();

    let residual = |values: &[f64]| -> Vec<f64> {
        x.iter()
            .zip(y)
            .map(|(&xi, &yi)| model.eval_at(xi, values) - yi)
            .collect()
    };

    let outcome = minimize(residual, initial, options);
    let free = initial.free_indices();

    let mut params = initial.clone();
    for (param, value) in params.iter_mut().zip(&outcome.values) {
        param.value = *value;
    }
    model.update_derived(&mut params);

    let names: Vec<String> = free.iter().map(|&i| params.at(i).name.clone()).collect();
    let (correlation_list, covariance) = match outcome.covariance {
        Some(cov) => {
            apply_covariance(model, &mut params, &free, &cov);
            (correlations(&names, &cov, MIN_CORRELATION), Some((names, cov)))
        }
        None => {
            log::warn!("Could not estimate error-bars, covariance matrix is singular");
            (Vec::new(), None)
        }
    };

    let values = params.values();
    let best_fit = model.eval(x, &values);
    let components = model.eval_components(x, &values);
    let statistics = FitStatistics::compute(outcome.nfev, free.len(), &outcome.residual, y);

    if !outcome.success {
        log::warn!("Fit did not converge: {}", outcome.message);
    }

    Ok(FitResult {
        model: model.description(),
        params,
        best_fit,
        components,
        success: outcome.success,
        message: outcome.message,
        statistics,
        correlations: correlation_list,
        covariance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::lineshape::{lorentzian, Background};
    use crate::models::Tolerances;
    use approx::assert_abs_diff_eq;

    fn synthetic_two_peaks() -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..400).map(|i| 1000.0 + 2.0 * i as f64).collect();
        let y = x
            .iter()
            .map(|&xi| {
                0.0002 * xi - 0.1
                    + lorentzian(xi, 60.0, 1352.0, 30.0)
                    + lorentzian(xi, 90.0, 1585.0, 20.0)
            })
            .collect();
        (x, y)
    }

    fn tolerances() -> Tolerances {
        Tolerances {
            min_max_amplitude: (0.0, 200.0),
            min_max_sigma: (0.0, 200.0),
            center_tolerance: 10.0,
            amplitude: 10.0,
            sigma: 10.0,
        }
    }

    #[test]
    fn test_recovers_two_peaks_on_linear_background() {
        let (x, y) = synthetic_two_peaks();
        let model =
            CompositeModel::build(Background::Linear, &[1350.0, 1580.0], &tolerances()).unwrap();
        let result = fit_model(&model, &x, &y).unwrap();

        assert!(result.success, "{}", result.message);
        let value = |name: &str| result.params.get(name).unwrap().value;
        assert_abs_diff_eq!(value("lz1center"), 1352.0, epsilon = 1e-3);
        assert_abs_diff_eq!(value("lz2center"), 1585.0, epsilon = 1e-3);
        assert_abs_diff_eq!(value("lz1amplitude"), 60.0, epsilon = 1e-2);
        assert_abs_diff_eq!(value("lz2sigma"), 20.0, epsilon = 1e-3);
        assert_abs_diff_eq!(value("lz2fwhm"), 40.0, epsilon = 2e-3);
        assert_abs_diff_eq!(value("bkgslope"), 0.0002, epsilon = 1e-6);
        assert!(result.statistics.rsquared > 0.999);
        assert_eq!(result.statistics.nvarys, 8);
        assert_eq!(result.components.len(), 3);
    }

    #[test]
    fn test_bounds_respected() {
        let (x, y) = synthetic_two_peaks();
        let tight = Tolerances {
            min_max_amplitude: (0.0, 50.0),
            ..tolerances()
        };
        let model = CompositeModel::build(Background::Linear, &[1350.0, 1580.0], &tight).unwrap();
        let result = fit_model(&model, &x, &y).unwrap();

        for param in result.params.iter().filter(|p| p.is_free()) {
            assert!(param.value >= param.min && param.value <= param.max, "{}", param.name);
        }
        assert!(result.params.get("lz2amplitude").unwrap().value <= 50.0);
    }

    #[test]
    fn test_stderr_propagated_to_derived() {
        let (x, mut y) = synthetic_two_peaks();
        for (i, v) in y.iter_mut().enumerate() {
            *v += 0.002 * ((i * 7919) % 13) as f64 / 13.0 - 0.001;
        }
        let model =
            CompositeModel::build(Background::Linear, &[1350.0, 1580.0], &tolerances()).unwrap();
        let result = fit_model(&model, &x, &y).unwrap();

        let sigma = result.params.get("lz1sigma").unwrap().stderr.unwrap();
        let fwhm = result.params.get("lz1fwhm").unwrap().stderr.unwrap();
        assert_abs_diff_eq!(fwhm, 2.0 * sigma, epsilon = 1e-12);
        assert!(result.params.get("lz1height").unwrap().stderr.is_some());
    }

    #[test]
    fn test_empty_spectrum_is_error() {
        let model = CompositeModel::build(Background::Linear, &[1.0], &tolerances()).unwrap();
        assert!(matches!(
            fit_model(&model, &[], &[]),
            Err(RamanfitError::EmptySpectrum)
        ));
    }
}
