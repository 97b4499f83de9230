//! # 拟合结果
//!
//! 最优参数（含标准误差）、最优曲线、各组件曲线、收敛状态和拟合统计量。
//!
//! ## 统计量
//! ```text
//! χ²      = Σ r²
//! χ²_red  = χ² / (N - P)
//! AIC     = N·ln(χ²/N) + 2P
//! BIC     = N·ln(χ²/N) + ln(N)·P
//! R²      = 1 - χ² / Σ(y - ȳ)²
//! ```
//!
//! ## 依赖关系
//! - 被 `fit/engine.rs` 创建
//! - 被 `report/` 使用

use crate::fit::lineshape::lorentzian_height_gradient;
use crate::fit::model::{ComponentCurve, CompositeModel};
use crate::models::Parameters;

use nalgebra::DMatrix;
use serde::Serialize;

/// 相关系数报告阈值
pub const MIN_CORRELATION: f64 = 0.1;

/// 拟合统计量
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitStatistics {
    pub nfev: usize,
    pub ndata: usize,
    pub nvarys: usize,
    pub chisqr: f64,
    pub redchi: f64,
    pub aic: f64,
    pub bic: f64,
    pub rsquared: f64,
}

impl FitStatistics {
    pub fn compute(nfev: usize, nvarys: usize, residual: &[f64], y: &[f64]) -> Self {
        let ndata = residual.len();
        let n = ndata as f64;
        let chisqr: f64 = residual.iter().map(|r| r * r).sum();
        let nfree = ndata.saturating_sub(nvarys).max(1) as f64;

        // χ² 为零时 ln 发散，按机器精度下限截断
        let neg2_log_likel = n * (chisqr.max(f64::MIN_POSITIVE) / n).ln();

        let mean = y.iter().sum::<f64>() / n;
        let total: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();

        FitStatistics {
            nfev,
            ndata,
            nvarys,
            chisqr,
            redchi: chisqr / nfree,
            aic: neg2_log_likel + 2.0 * nvarys as f64,
            bic: neg2_log_likel + n.ln() * nvarys as f64,
            rsquared: 1.0 - chisqr / total,
        }
    }
}

/// 一对参数的相关系数
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub first: String,
    pub second: String,
    pub value: f64,
}

/// 单次拟合的完整结果
#[derive(Debug, Clone)]
pub struct FitResult {
    /// 模型描述
    pub model: String,

    /// 最优参数
    pub params: Parameters,

    /// 最优曲线
    pub best_fit: Vec<f64>,

    /// 各组件曲线（背景在前）
    pub components: Vec<(String, ComponentCurve)>,

    pub success: bool,
    pub message: String,

    pub statistics: FitStatistics,

    /// |C| ≥ 0.1 的相关系数，按绝对值降序
    pub correlations: Vec<Correlation>,

    /// 自由参数名称与协方差矩阵
    pub covariance: Option<(Vec<String>, DMatrix<f64>)>,
}

impl FitResult {
    /// 协方差可用时误差是否已估计
    pub fn errorbars(&self) -> bool {
        self.covariance.is_some()
    }
}

/// 将协方差写入参数标准误差，并传播到派生参数
pub fn apply_covariance(
    model: &CompositeModel,
    params: &mut Parameters,
    free: &[usize],
    covariance: &DMatrix<f64>,
) {
    for (k, &idx) in free.iter().enumerate() {
        params.at_mut(idx).stderr = Some(covariance[(k, k)].sqrt());
    }

    let position = |idx: usize| free.iter().position(|&i| i == idx);

    for peak in model.peaks() {
        let (Some(a), Some(s)) = (position(peak.amplitude), position(peak.sigma)) else {
            continue;
        };

        params.at_mut(peak.fwhm).stderr = Some(2.0 * covariance[(s, s)].sqrt());

        let amplitude = params.at(peak.amplitude).value;
        let sigma = params.at(peak.sigma).value;
        let (ga, gs) = lorentzian_height_gradient(amplitude, sigma);
        let variance = ga * ga * covariance[(a, a)]
            + 2.0 * ga * gs * covariance[(a, s)]
            + gs * gs * covariance[(s, s)];
        params.at_mut(peak.height).stderr = Some(variance.max(0.0).sqrt());
    }
}

/// 相关系数列表（|C| ≥ `min_correl`），按绝对值降序
pub fn correlations(names: &[String], covariance: &DMatrix<f64>, min_correl: f64) -> Vec<Correlation> {
    let mut list = Vec::new();
    for i in 0..names.len() {
        for j in i + 1..names.len() {
            let denom = (covariance[(i, i)] * covariance[(j, j)]).sqrt();
            if denom <= 0.0 {
                continue;
            }
            let value = covariance[(i, j)] / denom;
            if value.abs() >= min_correl {
                list.push(Correlation {
                    first: names[i].clone(),
                    second: names[j].clone(),
                    value,
                });
            }
        }
    }
    list.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_statistics() {
        let residual = vec![0.1, -0.1, 0.2, -0.2];
        let y = vec![1.0, 2.0, 3.0, 4.0];
        let stats = FitStatistics::compute(17, 2, &residual, &y);

        assert_relative_eq!(stats.chisqr, 0.1, epsilon = 1e-12);
        assert_relative_eq!(stats.redchi, 0.05, epsilon = 1e-12);
        assert_relative_eq!(stats.rsquared, 1.0 - 0.1 / 5.0, epsilon = 1e-12);
        assert_relative_eq!(stats.aic, 4.0 * (0.1_f64 / 4.0).ln() + 4.0, epsilon = 1e-12);
        assert_relative_eq!(stats.bic, 4.0 * (0.1_f64 / 4.0).ln() + 4.0_f64.ln() * 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_correlations_sorted_and_filtered() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let cov = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.05, -0.8, 0.05, 1.0, 0.3, -0.8, 0.3, 1.0],
        );
        let list = correlations(&names, &cov, MIN_CORRELATION);
        assert_eq!(list.len(), 2);
        assert_eq!((list[0].first.as_str(), list[0].second.as_str()), ("a", "c"));
        assert_relative_eq!(list[0].value, -0.8);
        assert_relative_eq!(list[1].value, 0.3);
    }
}
