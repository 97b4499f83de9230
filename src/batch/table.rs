//! # 样品结果汇总表
//!
//! 从每个样品的 `{base}_params.txt` 读取各峰的 fwhm、center、height，
//! 组成以 (样品, 峰) 为索引的长表，并在其上计算：
//!
//! - 每个 (峰, 列) 的平均值与总体标准差
//! - D/G 强度比（峰高之比，标签固定为 "D" 和 "G"）
//! - 等效晶粒尺寸 `La = 2.4e-10 · λ⁴ / (I_D/I_G)`（Cançado 2006，单位 nm）
//! - 可选的测量坐标（来自 `{base}.txt` 头部）
//!
//! 长表只在第一次需要宽表（每个样品一行）时转换一次。
//!
//! ## 依赖关系
//! - 被 `commands/aggregate.rs` 使用
//! - 使用 `parsers/params.rs`, `parsers/header.rs`
//! - 使用 `csv` 写出结果表

use crate::error::{RamanfitError, Result};
use crate::parsers::header::read_positions;
use crate::parsers::params::ParameterDump;
use crate::report::params::PARAMS_SUFFIX;

use serde::Serialize;
use std::path::{Path, PathBuf};

/// 默认激光波长 (nm)
pub const DEFAULT_WAVELENGTH: f64 = 532.0;

/// D 峰标签
pub const D_BAND: &str = "D";
/// G 峰标签
pub const G_BAND: &str = "G";

/// 坐标列名
pub const POSITION_COLUMNS: [&str; 3] = ["x(um)", "y(um)", "z(um)"];

/// 每个峰读取的列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakColumn {
    Fwhm,
    Center,
    Height,
}

impl PeakColumn {
    pub const ALL: [PeakColumn; 3] = [PeakColumn::Fwhm, PeakColumn::Center, PeakColumn::Height];

    pub fn name(&self) -> &'static str {
        match self {
            PeakColumn::Fwhm => "fwhm",
            PeakColumn::Center => "center",
            PeakColumn::Height => "height",
        }
    }

    fn index(&self) -> usize {
        match self {
            PeakColumn::Fwhm => 0,
            PeakColumn::Center => 1,
            PeakColumn::Height => 2,
        }
    }
}

/// 长表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub sample: String,
    pub peak: String,
    /// 按 `PeakColumn::ALL` 顺序
    pub values: [f64; 3],
}

impl SampleRow {
    pub fn get(&self, column: PeakColumn) -> f64 {
        self.values[column.index()]
    }
}

/// 宽表：每个样品一行
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    /// 不含样品列的表头
    pub headers: Vec<String>,
    pub rows: Vec<(String, Vec<f64>)>,
}

/// 单个 (峰, 列) 的统计量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakStatistics {
    pub peak: String,
    pub column: String,
    pub average: f64,
    pub std: f64,
}

/// 汇总表
#[derive(Debug, Clone)]
pub struct SampleTable {
    samples: Vec<String>,
    experiment_files: Vec<PathBuf>,
    peak_names: Vec<String>,
    rows: Vec<SampleRow>,
    wide: Option<WideTable>,
    has_positions: bool,
}

/// 第 n 个自动生成的峰名：a, b, ..., z, p27, p28, ...
pub fn generated_peak_name(index: usize) -> String {
    if index < 26 {
        ((b'a' + index as u8) as char).to_string()
    } else {
        format!("p{}", index + 1)
    }
}

/// 读取一个参数文件中各峰的 fwhm、center、height。
///
/// 未给出峰名时，峰数量由键名中的最大编号推断，峰名自动生成。
pub fn read_sample_peaks(
    dump: &ParameterDump,
    peak_names: Option<&[String]>,
) -> Result<Vec<(String, [f64; 3])>> {
    let names: Vec<String> = match peak_names {
        Some(names) => names.to_vec(),
        None => {
            let count = dump.peak_count();
            if count < 1 {
                return Err(RamanfitError::ParseError {
                    format: "parameter".to_string(),
                    path: dump.path.display().to_string(),
                    reason: "no Lorentzian parameters found".to_string(),
                });
            }
            (0..count as usize).map(generated_peak_name).collect()
        }
    };

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let mut values = [0.0; 3];
            for column in PeakColumn::ALL {
                let key = format!("lz{}{}", i + 1, column.name());
                values[column.index()] = dump.value(&key)?;
            }
            Ok((name, values))
        })
        .collect()
}

/// 等效晶粒尺寸 (nm)
pub fn crystallite_size(ratio: f64, wavelength: f64) -> f64 {
    2.4e-10 * wavelength.powi(4) / ratio
}

/// 对每个样品计算晶粒尺寸
pub fn crystallite_sizes(ratios: &[(String, f64)], wavelength: f64) -> Vec<(String, f64)> {
    ratios
        .iter()
        .map(|(sample, ratio)| (sample.clone(), crystallite_size(*ratio, wavelength)))
        .collect()
}

/// 去掉参数文件后缀得到样品基名
pub fn base_from_params_file(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_suffix(PARAMS_SUFFIX) {
        Some(base) => PathBuf::from(base),
        None => path.with_extension(""),
    }
}

impl SampleTable {
    /// 读取一组样品。
    ///
    /// `bases` 为不带后缀的样品路径：参数文件为 `{base}_params.txt`，
    /// 测量文件为 `{base}.txt`。任何样品读取失败都会中断整个汇总。
    pub fn from_bases(
        bases: &[PathBuf],
        peak_names: Option<Vec<String>>,
        sample_names: Option<Vec<String>>,
    ) -> Result<Self> {
        if bases.is_empty() {
            return Err(RamanfitError::InvalidArgument("no samples given".to_string()));
        }

        let samples = match sample_names {
            Some(names) if names.len() != bases.len() => {
                return Err(RamanfitError::InvalidArgument(format!(
                    "{} sample names given for {} samples",
                    names.len(),
                    bases.len()
                )))
            }
            Some(names) => names,
            None => bases.iter().map(|b| b.display().to_string()).collect(),
        };

        let mut rows = Vec::new();
        let mut labels: Option<Vec<String>> = None;

        for (base, sample) in bases.iter().zip(&samples) {
            log::info!("Reading sample {}", sample);
            let params_file = PathBuf::from(format!("{}{}", base.display(), PARAMS_SUFFIX));
            let dump = ParameterDump::read(&params_file)?;
            let peaks = read_sample_peaks(&dump, peak_names.as_deref())?;

            let names: Vec<String> = peaks.iter().map(|(name, _)| name.clone()).collect();
            match &labels {
                None => labels = Some(names),
                Some(expected) if *expected != names => {
                    return Err(RamanfitError::InvalidArgument(format!(
                        "sample '{}' has peaks [{}], expected [{}]",
                        sample,
                        names.join(", "),
                        expected.join(", ")
                    )))
                }
                Some(_) => {}
            }

            rows.extend(peaks.into_iter().map(|(peak, values)| SampleRow {
                sample: sample.clone(),
                peak,
                values,
            }));
        }

        Ok(SampleTable {
            samples,
            experiment_files: bases
                .iter()
                .map(|b| PathBuf::from(format!("{}.txt", b.display())))
                .collect(),
            peak_names: labels.unwrap_or_default(),
            rows,
            wide: None,
            has_positions: false,
        })
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn peak_names(&self) -> &[String] {
        &self.peak_names
    }

    /// 查找 (样品, 峰) 的值
    pub fn value(&self, sample: &str, peak: &str, column: PeakColumn) -> Result<f64> {
        self.rows
            .iter()
            .find(|r| r.sample == sample && r.peak == peak)
            .map(|r| r.get(column))
            .ok_or_else(|| RamanfitError::MissingPeak {
                sample: sample.to_string(),
                peak: peak.to_string(),
            })
    }

    /// 每个 (峰, 列) 的平均值和总体标准差
    pub fn statistics(&self) -> Vec<PeakStatistics> {
        let mut stats = Vec::new();
        for peak in &self.peak_names {
            for column in PeakColumn::ALL {
                let data: Vec<f64> = self
                    .rows
                    .iter()
                    .filter(|r| &r.peak == peak)
                    .map(|r| r.get(column))
                    .collect();
                let (average, std) = mean_std(&data);
                stats.push(PeakStatistics {
                    peak: peak.clone(),
                    column: column.name().to_string(),
                    average,
                    std,
                });
            }
        }
        stats
    }

    /// 每个样品的 D/G 峰高比
    pub fn intensity_ratios(&self) -> Result<Vec<(String, f64)>> {
        self.samples
            .iter()
            .map(|sample| {
                let d = self.value(sample, D_BAND, PeakColumn::Height)?;
                let g = self.value(sample, G_BAND, PeakColumn::Height)?;
                Ok((sample.clone(), d / g))
            })
            .collect()
    }

    /// 添加测量坐标列，只生效一次
    pub fn add_positions(&mut self) -> Result<()> {
        if self.has_positions {
            log::warn!("Positions already added, skipping");
            return Ok(());
        }

        let positions = self
            .experiment_files
            .iter()
            .map(|path| read_positions(path))
            .collect::<Result<Vec<_>>>()?;

        let wide = self.unstack();
        wide.headers
            .extend(POSITION_COLUMNS.iter().map(|s| s.to_string()));
        for ((_, values), xyz) in wide.rows.iter_mut().zip(positions) {
            values.extend(xyz);
        }
        self.has_positions = true;
        Ok(())
    }

    /// 转换为宽表（只转换一次）
    pub fn unstack(&mut self) -> &mut WideTable {
        let wide = match self.wide.take() {
            Some(wide) => wide,
            None => self.build_wide(),
        };
        self.wide.insert(wide)
    }

    /// 宽表视图，尚未转换时临时构建
    pub fn to_wide(&self) -> WideTable {
        match &self.wide {
            Some(wide) => wide.clone(),
            None => self.build_wide(),
        }
    }

    fn build_wide(&self) -> WideTable {
        let headers = PeakColumn::ALL
            .iter()
            .flat_map(|column| {
                self.peak_names
                    .iter()
                    .map(move |peak| format!("{}_{}", column.name(), peak))
            })
            .collect();

        let rows = self
            .samples
            .iter()
            .map(|sample| {
                let values = PeakColumn::ALL
                    .iter()
                    .flat_map(|&column| {
                        self.peak_names.iter().map(move |peak| {
                            self.rows
                                .iter()
                                .find(|r| &r.sample == sample && &r.peak == peak)
                                .map(|r| r.get(column))
                                .unwrap_or(f64::NAN)
                        })
                    })
                    .collect();
                (sample.clone(), values)
            })
            .collect();

        WideTable { headers, rows }
    }

    /// 写出宽表 CSV
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let wide = self.to_wide();
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["sample".to_string()];
        header.extend(wide.headers.iter().cloned());
        writer.write_record(&header)?;

        for (sample, values) in &wide.rows {
            let mut record = vec![sample.clone()];
            record.extend(values.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }

        writer.flush().map_err(|e| RamanfitError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// 平均值与总体标准差
fn mean_std(data: &[f64]) -> (f64, f64) {
    if data.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let var = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
