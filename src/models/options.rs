//! # 拟合选项数据模型
//!
//! 峰文件 `[other data]` 段中可识别的所有选项，以及由它们推导出的
//! 平滑参数和峰参数约束。
//!
//! 每个选项都是可选的：缺失或格式错误时使用默认值，并记录一条日志，
//! 不会返回错误。
//!
//! ## 依赖关系
//! - 被 `parsers/config.rs` 填充
//! - 被 `fit/target.rs`, `fit/pipeline.rs` 使用

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// 默认平滑窗口长度
pub const DEFAULT_WINDOW_SIZE: usize = 15;
/// 默认平滑多项式阶数
pub const DEFAULT_POLY_ORDER: usize = 3;
/// 默认背景类型
pub const DEFAULT_POLY_TYPE: &str = "quadratic";

/// `[other data]` 段的显式表示
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub window_size: Option<usize>,
    pub poly_order: Option<usize>,
    pub poly_type: Option<String>,
    pub min_max_amplitude: Option<(f64, f64)>,
    pub min_max_sigma: Option<(f64, f64)>,
    pub peak_center_tolerance: Option<f64>,
    pub amplitude: Option<f64>,
    pub sigma: Option<f64>,
}

/// Savitzky-Golay 平滑参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothingOptions {
    pub window_size: usize,
    pub poly_order: usize,
}

impl FitOptions {
    /// 平滑参数，缺失项取默认值
    pub fn smoothing(&self) -> SmoothingOptions {
        SmoothingOptions {
            window_size: resolve(self.window_size, "window_size", DEFAULT_WINDOW_SIZE),
            poly_order: resolve(self.poly_order, "poly_order", DEFAULT_POLY_ORDER),
        }
    }

    /// 背景模型名称，缺失时为 quadratic
    pub fn poly_type(&self) -> String {
        resolve(
            self.poly_type.clone(),
            "poly_type",
            DEFAULT_POLY_TYPE.to_string(),
        )
    }
}

/// 解析可选值：缺失时记录日志并返回默认值
pub fn resolve<T: Debug>(value: Option<T>, key: &str, default: T) -> T {
    match value {
        Some(v) => v,
        None => {
            log::info!("{} not found, set to default: {:?}", key, default);
            default
        }
    }
}

/// 单个 Lorentzian 峰的初值与约束，每种光谱类型各有一套默认值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// 振幅范围 (min, max)
    pub min_max_amplitude: (f64, f64),
    /// sigma 范围 (min, max)
    pub min_max_sigma: (f64, f64),
    /// 峰中心允许偏移量 (±)
    pub center_tolerance: f64,
    /// 振幅初值
    pub amplitude: f64,
    /// sigma 初值
    pub sigma: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothing_defaults() {
        let options = FitOptions::default();
        let smoothing = options.smoothing();
        assert_eq!(smoothing.window_size, 15);
        assert_eq!(smoothing.poly_order, 3);
        assert_eq!(options.poly_type(), "quadratic");
    }

    #[test]
    fn test_smoothing_overrides() {
        let options = FitOptions {
            window_size: Some(21),
            poly_order: Some(2),
            poly_type: Some("linear".to_string()),
            ..Default::default()
        };
        let smoothing = options.smoothing();
        assert_eq!(smoothing.window_size, 21);
        assert_eq!(smoothing.poly_order, 2);
        assert_eq!(options.poly_type(), "linear");
    }
}
