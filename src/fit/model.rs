//! # 复合模型
//!
//! 背景 + N 个 Lorentzian 峰（`lz1`, `lz2`, ...）的加和模型。
//!
//! 模型在构建时确定参数布局：每个组件的参数在 `Parameters` 中的下标被预先记录，
//! 求值时直接按下标读取参数向量，不再做名称查找。
//!
//! ## 依赖关系
//! - 被 `fit/engine.rs`, `fit/pipeline.rs`, `report/` 使用
//! - 使用 `fit/lineshape.rs`, `models/parameters.rs`, `models/options.rs`

use crate::error::Result;
use crate::fit::lineshape::{lorentzian, lorentzian_fwhm, lorentzian_height, Background};
use crate::models::{Parameter, Parameters, Tolerances};

/// 背景参数前缀
pub const BACKGROUND_PREFIX: &str = "bkg";

/// 峰参数前缀
pub const PEAK_PREFIX: &str = "lz";

/// 单个 Lorentzian 组件的参数下标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeakComponent {
    pub prefix: String,
    pub amplitude: usize,
    pub center: usize,
    pub sigma: usize,
    pub fwhm: usize,
    pub height: usize,
}

/// 组件求值结果
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentCurve {
    /// 与 x 等长的曲线
    Curve(Vec<f64>),
    /// 常数背景
    Scalar(f64),
}

/// 背景 + Lorentzian 峰的复合模型
#[derive(Debug, Clone)]
pub struct CompositeModel {
    background: Background,
    background_indices: Vec<usize>,
    peaks: Vec<PeakComponent>,
    params: Parameters,
}

impl CompositeModel {
    /// 构建模型及其初始参数。
    ///
    /// 峰按输入顺序编号（从 1 开始），中心约束在 `c ± tol`，
    /// 振幅和 sigma 约束在配置范围内。
    pub fn build(background: Background, centers: &[f64], tolerances: &Tolerances) -> Result<Self> {
        let mut params = background.make_params(BACKGROUND_PREFIX)?;
        let background_indices = (0..params.len()).collect();

        let mut peaks = Vec::with_capacity(centers.len());
        for (i, &center) in centers.iter().enumerate() {
            let prefix = format!("{}{}", PEAK_PREFIX, i + 1);
            peaks.push(add_peak(&mut params, &prefix, center, tolerances)?);
        }

        let mut model = CompositeModel {
            background,
            background_indices,
            peaks,
            params,
        };
        let mut initial = model.params.clone();
        model.update_derived(&mut initial);
        model.params = initial;
        Ok(model)
    }

    pub fn background(&self) -> Background {
        self.background
    }

    pub fn peaks(&self) -> &[PeakComponent] {
        &self.peaks
    }

    /// 初始参数
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// 模型描述，例如
    /// `((Model(quadratic, prefix='bkg') + Model(lorentzian, prefix='lz1')) + ...)`
    pub fn description(&self) -> String {
        let mut text = format!(
            "Model({}, prefix='{}')",
            self.background.model_name(),
            BACKGROUND_PREFIX
        );
        for peak in &self.peaks {
            text = format!("({} + Model(lorentzian, prefix='{}'))", text, peak.prefix);
        }
        text
    }

    /// 在单点求值，`values` 为完整参数向量
    pub fn eval_at(&self, x: f64, values: &[f64]) -> f64 {
        let background = self.eval_background(x, values);
        self.peaks.iter().fold(background, |acc, peak| {
            acc + lorentzian(
                x,
                values[peak.amplitude],
                values[peak.center],
                values[peak.sigma],
            )
        })
    }

    /// 在所有 x 上求值
    pub fn eval(&self, x: &[f64], values: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.eval_at(xi, values)).collect()
    }

    /// 分别求值每个组件
    pub fn eval_components(&self, x: &[f64], values: &[f64]) -> Vec<(String, ComponentCurve)> {
        let mut components = Vec::with_capacity(self.peaks.len() + 1);

        let background = if self.background.is_scalar() {
            ComponentCurve::Scalar(self.eval_background(0.0, values))
        } else {
            ComponentCurve::Curve(x.iter().map(|&xi| self.eval_background(xi, values)).collect())
        };
        components.push((BACKGROUND_PREFIX.to_string(), background));

        for peak in &self.peaks {
            let curve = x
                .iter()
                .map(|&xi| {
                    lorentzian(
                        xi,
                        values[peak.amplitude],
                        values[peak.center],
                        values[peak.sigma],
                    )
                })
                .collect();
            components.push((peak.prefix.clone(), ComponentCurve::Curve(curve)));
        }

        components
    }

    /// 根据 amplitude 与 sigma 重新计算 fwhm 和 height
    pub fn update_derived(&self, params: &mut Parameters) {
        for peak in &self.peaks {
            let amplitude = params.at(peak.amplitude).value;
            let sigma = params.at(peak.sigma).value;
            params.at_mut(peak.fwhm).value = lorentzian_fwhm(sigma);
            params.at_mut(peak.height).value = lorentzian_height(amplitude, sigma);
        }
    }

    fn eval_background(&self, x: f64, values: &[f64]) -> f64 {
        let coeffs: Vec<f64> = self.background_indices.iter().map(|&i| values[i]).collect();
        self.background.eval(x, &coeffs)
    }
}

fn add_peak(
    params: &mut Parameters,
    prefix: &str,
    center: f64,
    tolerances: &Tolerances,
) -> Result<PeakComponent> {
    let (amp_min, amp_max) = tolerances.min_max_amplitude;
    let (sigma_min, sigma_max) = tolerances.min_max_sigma;
    let tol = tolerances.center_tolerance;

    let amplitude = params.add(
        Parameter::new(format!("{}amplitude", prefix), tolerances.amplitude)
            .with_bounds(amp_min, amp_max),
    )?;
    let center = params.add(
        Parameter::new(format!("{}center", prefix), center).with_bounds(center - tol, center + tol),
    )?;
    let sigma = params.add(
        Parameter::new(format!("{}sigma", prefix), tolerances.sigma)
            .with_bounds(sigma_min, sigma_max),
    )?;
    let fwhm = params.add(Parameter::derived(
        format!("{}fwhm", prefix),
        format!("2.0000000*{}sigma", prefix),
    ))?;
    let height = params.add(Parameter::derived(
        format!("{}height", prefix),
        format!(
            "0.3183099*{p}amplitude/max(1e-15, {p}sigma)",
            p = prefix
        ),
    ))?;

    Ok(PeakComponent {
        prefix: prefix.to_string(),
        amplitude,
        center,
        sigma,
        fwhm,
        height,
    })
}
