//! # 强度预处理
//!
//! - Savitzky-Golay 平滑（居中窗口，边缘用同阶多项式插值）
//! - min-max 归一化到 [0, 1]
//! - 除以最大值归一化、线性去趋势（读取器选项）
//!
//! ## 依赖关系
//! - 被 `fit/pipeline.rs`, `parsers/raman.rs`, `parsers/xrd.rs` 使用
//! - 使用 `nalgebra` 计算最小二乘系数

use crate::error::{RamanfitError, Result};

use nalgebra::{DMatrix, DVector};

/// Savitzky-Golay 平滑。
///
/// `window_length` 必须为奇数、大于 `poly_order` 且不超过数据长度，
/// 否则返回错误，由调用者负责保证。
pub fn savgol_filter(y: &[f64], window_length: usize, poly_order: usize) -> Result<Vec<f64>> {
    if window_length % 2 == 0 {
        return Err(RamanfitError::Smoothing(
            "window_length must be a positive odd integer".to_string(),
        ));
    }
    if poly_order >= window_length {
        return Err(RamanfitError::Smoothing(
            "polyorder must be less than window_length".to_string(),
        ));
    }
    if window_length > y.len() {
        return Err(RamanfitError::Smoothing(
            "window_length must be less than or equal to the size of x".to_string(),
        ));
    }

    let half = (window_length / 2) as isize;

    // 以窗口中心为原点的范德蒙德矩阵
    let vandermonde = DMatrix::from_fn(window_length, poly_order + 1, |i, j| {
        ((i as isize - half) as f64).powi(j as i32)
    });
    let pinv = vandermonde
        .pseudo_inverse(1e-12)
        .map_err(|e| RamanfitError::Smoothing(e.to_string()))?;

    let n = y.len();
    let half = half as usize;
    let mut smoothed = vec![0.0; n];

    for (k, out) in smoothed.iter_mut().enumerate().take(n - half).skip(half) {
        let window = &y[k - half..=k + half];
        *out = (0..window_length).map(|i| pinv[(0, i)] * window[i]).sum();
    }

    // 边缘：对首尾窗口拟合多项式并在窗口内求值
    let head = &pinv * DVector::from_column_slice(&y[..window_length]);
    for (i, out) in smoothed.iter_mut().enumerate().take(half) {
        *out = eval_poly(&head, i as f64 - half as f64);
    }

    let tail_start = n - window_length;
    let tail = &pinv * DVector::from_column_slice(&y[tail_start..]);
    for i in half + 1..window_length {
        smoothed[tail_start + i] = eval_poly(&tail, i as f64 - half as f64);
    }

    Ok(smoothed)
}

fn eval_poly(coeffs: &DVector<f64>, t: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * t + c)
}

/// 线性缩放到 [0, 1]。
///
/// 常数序列会除以零，结果为 NaN，不做保护。
pub fn normalize_min_max(y: &[f64]) -> Vec<f64> {
    let min = y.iter().copied().fold(f64::INFINITY, f64::min);
    let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    y.iter().map(|v| (v - min) / (max - min)).collect()
}

/// 除以最大值
pub fn normalize_to_max(y: &[f64]) -> Vec<f64> {
    let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    y.iter().map(|v| v / max).collect()
}

/// 减去对下标的最小二乘直线
pub fn detrend_linear(y: &[f64]) -> Vec<f64> {
    let n = y.len();
    if n < 2 {
        return y.iter().map(|_| 0.0).collect();
    }

    let t_mean = (n - 1) as f64 / 2.0;
    let y_mean = y.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, v) in y.iter().enumerate() {
        let dt = i as f64 - t_mean;
        sxy += dt * (v - y_mean);
        sxx += dt * dt;
    }
    let slope = sxy / sxx;

    y.iter()
        .enumerate()
        .map(|(i, v)| v - (y_mean + slope * (i as f64 - t_mean)))
        .collect()
}
