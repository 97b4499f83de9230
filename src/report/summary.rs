//! # 汇总结果写出
//!
//! - `statistics.txt`：ConfigObj 格式，`[peak]` / `[[column]]` / `average`, `std`
//! - `statistics.csv`：每个 (峰, 列) 一行
//! - `intensity_ratios.txt`、`crystallite_size.txt`：`sample = value`
//!
//! ## 依赖关系
//! - 被 `commands/aggregate.rs` 使用
//! - 使用 `parsers/config.rs` 的 Section 写出 ConfigObj 文本
//! - 使用 `csv` + `serde` 写出统计表

use crate::batch::PeakStatistics;
use crate::error::{RamanfitError, Result};
use crate::parsers::config::{write_config_file, Section};

use std::path::Path;

/// 统计结果的 ConfigObj 结构
pub fn statistics_section(stats: &[PeakStatistics]) -> Section {
    let mut root = Section::new("");
    for stat in stats {
        if root.section(&stat.peak).is_none() {
            root.add_section(Section::new(stat.peak.clone()));
        }
        let mut column = Section::new(stat.column.clone());
        column.set_scalar("average", stat.average);
        column.set_scalar("std", stat.std);

        if let Some(peak) = root.section_mut(&stat.peak) {
            peak.add_section(column);
        }
    }
    root
}

/// 写出 `statistics.txt`
pub fn write_statistics(stats: &[PeakStatistics], path: &Path) -> Result<()> {
    write_config_file(&statistics_section(stats), path)
}

/// 写出 `statistics.csv`
pub fn write_statistics_csv(stats: &[PeakStatistics], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for stat in stats {
        writer.serialize(stat)?;
    }
    writer.flush().map_err(|e| RamanfitError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 写出 `sample = value` 形式的文件
pub fn write_sample_values(values: &[(String, f64)], path: &Path) -> Result<()> {
    let mut root = Section::new("");
    for (sample, value) in values {
        root.set_scalar(sample.clone(), value);
    }
    write_config_file(&root, path)
}
