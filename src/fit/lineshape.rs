//! # 峰形与背景函数
//!
//! Lorentzian 峰：
//! ```text
//! f(x) = A/π · σ / ((x - c)² + σ²)
//! fwhm   = 2σ
//! height = A / (πσ)
//! ```
//!
//! 背景为封闭枚举 {Constant, Linear, Quadratic, CubicPolynomial}，
//! 每种背景自带参数名、初值和约束策略（系数均无界、初值为 0）。
//!
//! ## 依赖关系
//! - 被 `fit/model.rs` 使用
//! - 使用 `models/parameters.rs`

use crate::error::Result;
use crate::models::{Parameter, Parameters};

use std::f64::consts::PI;

/// 防止 sigma 为零时除零
const TINY: f64 = 1.0e-15;

/// Lorentzian 峰在 x 处的值
pub fn lorentzian(x: f64, amplitude: f64, center: f64, sigma: f64) -> f64 {
    let sigma = sigma.max(TINY);
    let dx = x - center;
    amplitude / PI * sigma / (dx * dx + sigma * sigma)
}

/// 半高全宽
pub fn lorentzian_fwhm(sigma: f64) -> f64 {
    2.0 * sigma
}

/// 峰高
pub fn lorentzian_height(amplitude: f64, sigma: f64) -> f64 {
    amplitude / (PI * sigma.max(TINY))
}

/// 峰高对 (amplitude, sigma) 的偏导数
pub fn lorentzian_height_gradient(amplitude: f64, sigma: f64) -> (f64, f64) {
    let sigma = sigma.max(TINY);
    (1.0 / (PI * sigma), -amplitude / (PI * sigma * sigma))
}

/// 背景模型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Constant,
    Linear,
    Quadratic,
    /// 三次多项式
    CubicPolynomial,
}

impl Background {
    /// 按名称选择背景（不区分大小写），未知名称回退到 quadratic
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "constant" => Background::Constant,
            "linear" => Background::Linear,
            "quadratic" => Background::Quadratic,
            "cubic" => Background::CubicPolynomial,
            other => {
                log::warn!(
                    "Background model '{}' not available, using quadratic",
                    other
                );
                Background::Quadratic
            }
        }
    }

    /// 模型名称（用于报告）
    pub fn model_name(&self) -> &'static str {
        match self {
            Background::Constant => "constant",
            Background::Linear => "linear",
            Background::Quadratic => "quadratic",
            Background::CubicPolynomial => "polynomial",
        }
    }

    /// 参数名（不含前缀），顺序即参数向量顺序
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Background::Constant => &["c"],
            Background::Linear => &["slope", "intercept"],
            Background::Quadratic => &["a", "b", "c"],
            Background::CubicPolynomial => &["c0", "c1", "c2", "c3"],
        }
    }

    /// 参数初值
    pub fn defaults(&self) -> Vec<(&'static str, f64)> {
        self.parameter_names().iter().map(|&n| (n, 0.0)).collect()
    }

    /// 带前缀的参数集合
    pub fn make_params(&self, prefix: &str) -> Result<Parameters> {
        let mut params = Parameters::new();
        for (name, value) in self.defaults() {
            params.add(Parameter::new(format!("{}{}", prefix, name), value))?;
        }
        Ok(params)
    }

    /// 常数背景求值结果是标量
    pub fn is_scalar(&self) -> bool {
        matches!(self, Background::Constant)
    }

    /// 求值，`coeffs` 顺序与 `parameter_names` 一致
    pub fn eval(&self, x: f64, coeffs: &[f64]) -> f64 {
        match self {
            Background::Constant => coeffs[0],
            Background::Linear => coeffs[0] * x + coeffs[1],
            Background::Quadratic => coeffs[0] * x * x + coeffs[1] * x + coeffs[2],
            Background::CubicPolynomial => coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_background_selection() {
        let linear = Background::from_name("linear");
        assert_eq!(linear, Background::Linear);
        assert_eq!(linear.model_name(), "linear");
        assert_eq!(linear.defaults(), vec![("slope", 0.0), ("intercept", 0.0)]);

        assert_eq!(Background::from_name("CUBIC"), Background::CubicPolynomial);
        assert_eq!(Background::from_name("cubic"), Background::CubicPolynomial);
    }

    #[test]
    fn test_unknown_background_is_quadratic() {
        let unknown = Background::from_name("spline");
        let quadratic = Background::from_name("quadratic");
        assert_eq!(unknown, quadratic);
        assert_eq!(unknown.defaults(), quadratic.defaults());
    }

    #[test]
    fn test_background_eval() {
        assert_eq!(Background::Constant.eval(5.0, &[2.0]), 2.0);
        assert_eq!(Background::Linear.eval(2.0, &[3.0, 1.0]), 7.0);
        assert_eq!(Background::Quadratic.eval(2.0, &[1.0, 2.0, 3.0]), 11.0);
        assert_eq!(
            Background::CubicPolynomial.eval(2.0, &[1.0, 0.0, 0.0, 1.0]),
            9.0
        );
    }

    #[test]
    fn test_make_params_prefixed() {
        let params = Background::Quadratic.make_params("bkg").unwrap();
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["bkga", "bkgb", "bkgc"]);
        assert!(params.iter().all(|p| p.min.is_infinite() && p.max.is_infinite()));
    }

    #[test]
    fn test_lorentzian_shape() {
        let (amplitude, center, sigma) = (10.0, 1350.0, 20.0);
        let peak = lorentzian(center, amplitude, center, sigma);
        assert_relative_eq!(peak, lorentzian_height(amplitude, sigma), epsilon = 1e-12);
        let half = lorentzian(center + lorentzian_fwhm(sigma) / 2.0, amplitude, center, sigma);
        assert_relative_eq!(half, peak / 2.0, epsilon = 1e-12);
    }
}
