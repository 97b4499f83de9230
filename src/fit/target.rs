//! # 光谱类型能力接口
//!
//! Raman 与 XRD 的差异只在于读取方式、默认约束和坐标轴标签，
//! 统一通过 `FitTarget` 暴露给共享的拟合流程。
//!
//! | 选项                    | Raman      | XRD                                |
//! |-------------------------|------------|------------------------------------|
//! | `min_max_amplitude`     | (0, 200)   | (0, 10)                            |
//! | `min_max_sigma`         | (0, 200)   | (0, 10)                            |
//! | `peak_center_tolerance` | 10         | 5                                  |
//! | 振幅初值                | `amplitude`, 10 | `peak_center_tolerance`, 10   |
//! | sigma 初值              | `sigma`, 10     | `peak_center_tolerance`, 10   |
//!
//! ## 依赖关系
//! - 被 `fit/pipeline.rs`, `commands/fit.rs` 使用
//! - 使用 `parsers/raman.rs`, `parsers/xrd.rs`

use crate::error::Result;
use crate::models::options::resolve;
use crate::models::{FitOptions, Spectrum, SpectrumKind, Tolerances};
use crate::parsers::raman::{read_raman_file, RamanReadOptions};
use crate::parsers::xrd::read_xrd_file;

use std::path::Path;

/// 一种光谱类型的读取与默认约束
pub trait FitTarget {
    fn kind(&self) -> SpectrumKind;

    /// 读取测量文件
    fn load_spectrum(&self, path: &Path) -> Result<Spectrum>;

    /// 由选项和类型默认值得到峰约束
    fn default_tolerances(&self, options: &FitOptions) -> Tolerances;

    /// 图表坐标轴标签 (x, y)
    fn axis_labels(&self) -> (&'static str, &'static str);
}

/// Raman 光谱
#[derive(Debug, Clone, Copy, Default)]
pub struct RamanTarget {
    pub read: RamanReadOptions,
}

impl FitTarget for RamanTarget {
    fn kind(&self) -> SpectrumKind {
        SpectrumKind::Raman
    }

    fn load_spectrum(&self, path: &Path) -> Result<Spectrum> {
        read_raman_file(path, self.read)
    }

    fn default_tolerances(&self, options: &FitOptions) -> Tolerances {
        Tolerances {
            min_max_amplitude: resolve(options.min_max_amplitude, "min_max_amplitude", (0.0, 200.0)),
            min_max_sigma: resolve(options.min_max_sigma, "min_max_sigma", (0.0, 200.0)),
            center_tolerance: resolve(options.peak_center_tolerance, "peak_center_tolerance", 10.0),
            amplitude: resolve(options.amplitude, "amplitude", 10.0),
            sigma: resolve(options.sigma, "sigma", 10.0),
        }
    }

    fn axis_labels(&self) -> (&'static str, &'static str) {
        ("Wavenumber, cm⁻¹", "Intensity, -")
    }
}

/// XRD 衍射谱
#[derive(Debug, Clone, Copy, Default)]
pub struct XrdTarget {
    /// 读取后除以最大值
    pub normalize: bool,
}

impl FitTarget for XrdTarget {
    fn kind(&self) -> SpectrumKind {
        SpectrumKind::Xrd
    }

    fn load_spectrum(&self, path: &Path) -> Result<Spectrum> {
        read_xrd_file(path, self.normalize)
    }

    /// 振幅和 sigma 初值沿用 `peak_center_tolerance` 的值（默认 10）
    fn default_tolerances(&self, options: &FitOptions) -> Tolerances {
        Tolerances {
            min_max_amplitude: resolve(options.min_max_amplitude, "min_max_amplitude", (0.0, 10.0)),
            min_max_sigma: resolve(options.min_max_sigma, "min_max_sigma", (0.0, 10.0)),
            center_tolerance: resolve(options.peak_center_tolerance, "peak_center_tolerance", 5.0),
            amplitude: resolve(options.peak_center_tolerance, "peak_center_tolerance", 10.0),
            sigma: resolve(options.peak_center_tolerance, "peak_center_tolerance", 10.0),
        }
    }

    fn axis_labels(&self) -> (&'static str, &'static str) {
        ("2θ, deg", "Intensity, -")
    }
}
