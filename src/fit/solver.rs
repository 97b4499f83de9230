//! # 带边界的 Levenberg-Marquardt 求解器
//!
//! ## 边界处理
//! 自由参数在内部空间中无约束优化，通过变换映射回外部（物理）空间：
//!
//! ```text
//! 双边界  [min, max]: x = min + (sin(p) + 1)·(max - min)/2
//! 仅下界  [min, +∞):  x = min - 1 + sqrt(p² + 1)
//! 仅上界  (-∞, max]:  x = max + 1 - sqrt(p² + 1)
//! ```
//!
//! ## 迭代
//! 每步求解阻尼最小二乘问题 `[J; √λ·D] δ = [-r; 0]`（SVD），
//! D 为 Jacobian 列范数的累计最大值。停止条件：
//! - 实际与预测的相对残差下降均不超过 `ftol`
//! - 相对步长不超过 `xtol`
//! - 残差与 Jacobian 各列夹角余弦不超过 `gtol`
//! - 函数求值次数达到上限（默认 `2000·(nvarys + 1)`）
//!
//! 未收敛不会返回错误，而是体现在 `SolverOutcome::success` 和 `message` 中。
//!
//! ## 协方差
//! 在最优解处用外部空间的前向差分 Jacobian 计算
//! `cov = (JᵀJ)⁻¹ · χ²/(N - P)`，矩阵奇异时为 None。
//!
//! ## 依赖关系
//! - 被 `fit/engine.rs` 使用
//! - 使用 `nalgebra` 进行线性代数运算

use crate::models::{Parameter, Parameters};

use nalgebra::{DMatrix, DVector};

/// 每个自由参数的默认函数求值预算系数
const NFEV_PER_VARY: usize = 2000;

/// 阻尼系数上限，超过时认为无法继续下降
const MAX_LAMBDA: f64 = 1.0e16;

/// 求解器选项
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// 最大函数求值次数，None 时为 `2000·(nvarys + 1)`
    pub max_nfev: Option<usize>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            ftol: 1.5e-8,
            xtol: 1.5e-8,
            gtol: 0.0,
            max_nfev: None,
        }
    }
}

/// 求解结果
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    /// 完整参数向量（含固定和派生参数），顺序与 `Parameters` 一致
    pub values: Vec<f64>,

    /// 最优解处的残差
    pub residual: Vec<f64>,

    /// 函数求值次数
    pub nfev: usize,

    pub success: bool,
    pub message: String,

    /// 自由参数的协方差矩阵
    pub covariance: Option<DMatrix<f64>>,
}

/// 单个参数的边界类型
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    Free,
    Lower(f64),
    Upper(f64),
    Both(f64, f64),
}

impl Bounds {
    pub fn of(param: &Parameter) -> Self {
        match (param.min.is_finite(), param.max.is_finite()) {
            (true, true) => Bounds::Both(param.min, param.max),
            (true, false) => Bounds::Lower(param.min),
            (false, true) => Bounds::Upper(param.max),
            (false, false) => Bounds::Free,
        }
    }

    /// 截断到边界内
    pub fn clip(self, value: f64) -> f64 {
        match self {
            Bounds::Free => value,
            Bounds::Lower(min) => value.max(min),
            Bounds::Upper(max) => value.min(max),
            Bounds::Both(min, max) => value.max(min).min(max),
        }
    }

    /// 外部值 → 内部值
    pub fn to_internal(self, value: f64) -> f64 {
        let value = self.clip(value);
        match self {
            Bounds::Free => value,
            Bounds::Lower(min) => ((value - min + 1.0).powi(2) - 1.0).sqrt(),
            Bounds::Upper(max) => ((max - value + 1.0).powi(2) - 1.0).sqrt(),
            Bounds::Both(min, max) => {
                if max <= min {
                    return 0.0;
                }
                (2.0 * (value - min) / (max - min) - 1.0).clamp(-1.0, 1.0).asin()
            }
        }
    }

    /// 内部值 → 外部值
    pub fn to_external(self, internal: f64) -> f64 {
        match self {
            Bounds::Free => internal,
            Bounds::Lower(min) => min - 1.0 + (internal * internal + 1.0).sqrt(),
            Bounds::Upper(max) => max + 1.0 - (internal * internal + 1.0).sqrt(),
            Bounds::Both(min, max) => min + (internal.sin() + 1.0) * (max - min) / 2.0,
        }
    }
}

/// 残差函数及其求值计数
struct Problem<'a, F> {
    residual: F,
    full: Vec<f64>,
    free: &'a [usize],
    bounds: &'a [Bounds],
    nfev: usize,
}

impl<F> Problem<'_, F>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn set_internal(&mut self, p: &DVector<f64>) {
        for (k, &idx) in self.free.iter().enumerate() {
            self.full[idx] = self.bounds[k].to_external(p[k]);
        }
    }

    fn eval(&mut self, p: &DVector<f64>) -> DVector<f64> {
        self.set_internal(p);
        self.nfev += 1;
        DVector::from_vec((self.residual)(&self.full))
    }

    /// 内部空间前向差分 Jacobian
    fn jacobian(&mut self, p: &DVector<f64>, r: &DVector<f64>) -> DMatrix<f64> {
        let mut jac = DMatrix::zeros(r.len(), p.len());
        let mut shifted = p.clone();
        for j in 0..p.len() {
            let h = step_size(p[j]);
            shifted[j] = p[j] + h;
            let r_shifted = self.eval(&shifted);
            jac.set_column(j, &((r_shifted - r) / h));
            shifted[j] = p[j];
        }
        self.set_internal(p);
        jac
    }
}

fn step_size(value: f64) -> f64 {
    let h = f64::EPSILON.sqrt() * value.abs();
    if h == 0.0 {
        f64::EPSILON.sqrt()
    } else {
        h
    }
}

/// 最小化残差平方和。
///
/// `residual` 接收完整参数向量（顺序与 `params` 一致），返回残差向量。
/// 只有 `is_free()` 的参数会被调整，初值超出边界时先截断。
pub fn minimize<F>(residual: F, params: &Parameters, options: &SolverOptions) -> SolverOutcome
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let free = params.free_indices();
    let bounds: Vec<Bounds> = free.iter().map(|&i| Bounds::of(params.at(i))).collect();
    let n = free.len();
    let max_nfev = options.max_nfev.unwrap_or(NFEV_PER_VARY * (n + 1));

    let p0 = DVector::from_iterator(
        n,
        free.iter()
            .zip(&bounds)
            .map(|(&i, b)| b.to_internal(params.at(i).value)),
    );

    let mut problem = Problem {
        residual,
        full: params.values(),
        free: &free,
        bounds: &bounds,
        nfev: 0,
    };

    let (p, r, success, message) = iterate(&mut problem, p0, options, max_nfev);
    problem.set_internal(&p);

    let cost = r.norm_squared();
    let covariance = if cost.is_finite() {
        covariance(&problem, &r, cost)
    } else {
        None
    };

    SolverOutcome {
        values: problem.full.clone(),
        residual: r.iter().copied().collect(),
        nfev: problem.nfev,
        success,
        message,
        covariance,
    }
}

fn iterate<F>(
    problem: &mut Problem<'_, F>,
    mut p: DVector<f64>,
    options: &SolverOptions,
    max_nfev: usize,
) -> (DVector<f64>, DVector<f64>, bool, String)
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = p.len();
    let mut r = problem.eval(&p);
    let mut cost = r.norm_squared();

    if !cost.is_finite() {
        return (p, r, false, "Residual is not finite at the initial values".to_string());
    }
    if n == 0 {
        return (p, r, true, "No free parameters to vary".to_string());
    }

    let mut diag = DVector::<f64>::zeros(n);
    let mut lambda = 1.0e-3;

    loop {
        if cost == 0.0 {
            return (p, r, true, "Residual is exactly zero".to_string());
        }
        if problem.nfev + n > max_nfev {
            return (p, r, false, max_nfev_message(max_nfev));
        }

        let jac = problem.jacobian(&p, &r);
        let rnorm = cost.sqrt();
        let mut gnorm: f64 = 0.0;
        for j in 0..n {
            let col_norm = jac.column(j).norm();
            diag[j] = diag[j].max(col_norm);
            if diag[j] == 0.0 {
                diag[j] = 1.0;
            }
            if col_norm > 0.0 {
                gnorm = gnorm.max((jac.column(j).dot(&r) / (col_norm * rnorm)).abs());
            }
        }
        if gnorm <= options.gtol {
            return (
                p,
                r,
                true,
                "The cosine of the angle between the residual and the Jacobian is at most gtol"
                    .to_string(),
            );
        }

        // 内层循环：调整阻尼直到残差下降
        loop {
            if problem.nfev >= max_nfev {
                return (p, r, false, max_nfev_message(max_nfev));
            }

            let Some(step) = damped_step(&jac, &r, &diag, lambda) else {
                lambda *= 10.0;
                if lambda > MAX_LAMBDA {
                    return (p, r, false, "Damped normal equations are singular".to_string());
                }
                continue;
            };

            let scaled_step = step.component_mul(&diag).norm();
            let scaled_p = p.component_mul(&diag).norm();
            let p_new = &p + &step;
            let r_new = problem.eval(&p_new);
            let cost_new = r_new.norm_squared();

            if cost_new.is_finite() && cost_new < cost {
                let actual = (cost - cost_new) / cost;
                let predicted =
                    ((&jac * &step).norm_squared() + 2.0 * lambda * scaled_step.powi(2)) / cost;

                p = p_new;
                r = r_new;
                cost = cost_new;
                lambda = (lambda / 10.0).max(1.0e-12);

                if actual <= options.ftol && predicted <= options.ftol {
                    return (
                        p,
                        r,
                        true,
                        "Both actual and predicted relative reductions in chi-square are at most ftol"
                            .to_string(),
                    );
                }
                if scaled_step <= options.xtol * (scaled_p + options.xtol) {
                    return (
                        p,
                        r,
                        true,
                        "Relative error between two consecutive iterates is at most xtol"
                            .to_string(),
                    );
                }
                break;
            }

            if scaled_step <= options.xtol * (scaled_p + options.xtol) {
                return (
                    p,
                    r,
                    true,
                    "Relative error between two consecutive iterates is at most xtol".to_string(),
                );
            }

            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                return (
                    p,
                    r,
                    false,
                    "No further reduction in chi-square is possible".to_string(),
                );
            }
        }
    }
}

/// 求解 `[J; √λ·D] δ = [-r; 0]`
fn damped_step(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    diag: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let (m, n) = jac.shape();
    let mut a = DMatrix::zeros(m + n, n);
    a.view_mut((0, 0), (m, n)).copy_from(jac);
    let damping = lambda.sqrt();
    for j in 0..n {
        a[(m + j, j)] = damping * diag[j];
    }

    let mut b = DVector::zeros(m + n);
    b.rows_mut(0, m).copy_from(&(-r));

    let svd = a.svd(true, true);
    svd.solve(&b, 1e-14)
        .ok()
        .filter(|step| step.iter().all(|v| v.is_finite()))
}

/// 外部空间协方差矩阵
fn covariance<F>(problem: &Problem<'_, F>, r: &DVector<f64>, cost: f64) -> Option<DMatrix<f64>>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let m = r.len();
    let n = problem.free.len();
    if n == 0 || m <= n {
        return None;
    }

    let base = problem.full.clone();
    let mut jac = DMatrix::zeros(m, n);
    for (k, &idx) in problem.free.iter().enumerate() {
        let value = base[idx];
        let mut h = step_size(value);
        let upper = match problem.bounds[k] {
            Bounds::Upper(max) | Bounds::Both(_, max) => max,
            _ => f64::INFINITY,
        };
        if value + h > upper {
            h = -h;
        }

        let mut shifted = base.clone();
        shifted[idx] = value + h;
        let r_shifted = DVector::from_vec((problem.residual)(&shifted));
        jac.set_column(k, &((r_shifted - r) / h));
    }

    let cov = (jac.transpose() * &jac).try_inverse()? * (cost / (m - n) as f64);
    let valid = cov.iter().all(|v| v.is_finite()) && cov.diagonal().iter().all(|v| *v >= 0.0);
    valid.then_some(cov)
}

fn max_nfev_message(max_nfev: usize) -> String {
    format!("Fit aborted: number of function evaluations > {}", max_nfev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bounds_round_trip() {
        let cases = [
            (Bounds::Free, 3.5),
            (Bounds::Lower(0.0), 12.0),
            (Bounds::Upper(5.0), -2.0),
            (Bounds::Both(1340.0, 1360.0), 1351.0),
        ];
        for (bounds, value) in cases {
            let back = bounds.to_external(bounds.to_internal(value));
            assert_abs_diff_eq!(back, value, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_external_stays_in_bounds() {
        let bounds = Bounds::Both(0.0, 10.0);
        for p in [-100.0, -1.3, 0.0, 2.7, 1e6] {
            let x = bounds.to_external(p);
            assert!((0.0..=10.0).contains(&x));
        }
        assert!(Bounds::Lower(2.0).to_external(-50.0) >= 2.0);
    }

    #[test]
    fn test_linear_fit_with_covariance() {
        // y = 2x + 1 加少量确定性扰动
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, xi)| 2.0 * xi + 1.0 + if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect();

        let mut params = Parameters::new();
        params.add(Parameter::new("slope", 0.0)).unwrap();
        params.add(Parameter::new("intercept", 0.0)).unwrap();

        let outcome = minimize(
            |v: &[f64]| x.iter().zip(&y).map(|(xi, yi)| v[0] * xi + v[1] - yi).collect(),
            &params,
            &SolverOptions::default(),
        );

        assert!(outcome.success, "{}", outcome.message);
        assert_abs_diff_eq!(outcome.values[0], 2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(outcome.values[1], 1.0, epsilon = 1e-2);
        let cov = outcome.covariance.unwrap();
        assert!(cov[(0, 0)] > 0.0 && cov[(1, 1)] > 0.0);
    }

    #[test]
    fn test_bounded_parameter_stays_inside() {
        // 无约束最优解 a = 5，上界 3
        let mut params = Parameters::new();
        params
            .add(Parameter::new("a", 1.0).with_bounds(0.0, 3.0))
            .unwrap();

        let outcome = minimize(
            |v: &[f64]| vec![v[0] - 5.0, 0.5 * (v[0] - 5.0)],
            &params,
            &SolverOptions::default(),
        );

        assert!(outcome.values[0] <= 3.0);
        assert_abs_diff_eq!(outcome.values[0], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_nfev_budget() {
        let mut params = Parameters::new();
        params.add(Parameter::new("a", 0.0)).unwrap();
        let options = SolverOptions {
            max_nfev: Some(3),
            ..Default::default()
        };

        let outcome = minimize(
            |v: &[f64]| vec![(v[0] - 1.0).exp() - 1.0, v[0].sin()],
            &params,
            &options,
        );
        assert!(!outcome.success);
        assert!(outcome.message.contains("> 3"));
    }
}
