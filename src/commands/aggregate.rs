//! # aggregate 子命令实现
//!
//! 读取多个样品的参数文件并写出：
//! - `table_results.csv`
//! - `statistics.txt` / `statistics.csv`
//! - `intensity_ratios.txt` / `crystallite_size.txt`（`--ratios`）
//!
//! 任何样品缺失或格式错误都会中断整个汇总。
//!
//! ## 依赖关系
//! - 使用 `cli/aggregate.rs` 定义的 AggregateArgs
//! - 使用 `batch/table.rs` 汇总，`report/summary.rs` 写出
//! - 使用 `glob` 展开 `--dir`，`tabled` 打印统计表

use crate::batch::table::{base_from_params_file, crystallite_sizes};
use crate::batch::{PeakStatistics, SampleTable};
use crate::cli::aggregate::AggregateArgs;
use crate::error::{RamanfitError, Result};
use crate::report::summary::{write_sample_values, write_statistics, write_statistics_csv};
use crate::utils::output;

use std::fs;
use std::path::PathBuf;
use tabled::{Table, Tabled};

/// 执行汇总命令
pub fn execute(args: AggregateArgs) -> Result<()> {
    output::print_header("Aggregate Fit Results");

    let bases = resolve_bases(&args)?;
    output::print_info(&format!("Reading {} samples", bases.len()));

    let mut table =
        SampleTable::from_bases(&bases, args.peak_names.clone(), args.sample_names.clone())?;
    output::print_info(&format!(
        "{} samples, peaks: {}",
        table.samples().len(),
        table.peak_names().join(", ")
    ));

    fs::create_dir_all(&args.output_dir).map_err(|e| RamanfitError::FileWriteError {
        path: args.output_dir.display().to_string(),
        source: e,
    })?;

    if args.positions {
        table.add_positions()?;
    }

    let table_path = args.output_dir.join("table_results.csv");
    table.write_csv(&table_path)?;
    output::print_saved("Results table", &table_path);

    let stats = table.statistics();
    print_statistics(&stats);

    let stats_path = args.output_dir.join("statistics.txt");
    write_statistics(&stats, &stats_path)?;
    let stats_csv = args.output_dir.join("statistics.csv");
    write_statistics_csv(&stats, &stats_csv)?;
    output::print_saved("Statistics", &stats_path);
    output::print_saved("Statistics (CSV)", &stats_csv);

    if args.ratios {
        let ratios = table.intensity_ratios()?;
        let ratios_path = args.output_dir.join("intensity_ratios.txt");
        write_sample_values(&ratios, &ratios_path)?;
        output::print_saved("D/G intensity ratios", &ratios_path);

        let sizes = crystallite_sizes(&ratios, args.wavelength);
        let sizes_path = args.output_dir.join("crystallite_size.txt");
        write_sample_values(&sizes, &sizes_path)?;
        output::print_saved(
            &format!("Crystallite sizes (λ = {} nm)", args.wavelength),
            &sizes_path,
        );
    }

    Ok(())
}

/// 样品基名：命令行给出的，加上 `--dir` 中匹配的参数文件
fn resolve_bases(args: &AggregateArgs) -> Result<Vec<PathBuf>> {
    let mut bases = args.bases.clone();

    if let Some(dir) = &args.dir {
        if !dir.is_dir() {
            return Err(RamanfitError::DirectoryNotFound {
                path: dir.display().to_string(),
            });
        }
        let pattern = dir.join(&args.pattern).display().to_string();
        let entries = glob::glob(&pattern).map_err(|e| {
            RamanfitError::InvalidArgument(format!("invalid pattern '{}': {}", pattern, e))
        })?;

        let mut found: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .map(|path| base_from_params_file(&path))
            .collect();
        found.sort();

        if found.is_empty() {
            return Err(RamanfitError::NoFilesFound { pattern });
        }
        bases.extend(found);
    }

    if bases.is_empty() {
        return Err(RamanfitError::InvalidArgument(
            "give sample base paths or --dir".to_string(),
        ));
    }
    Ok(bases)
}

fn print_statistics(stats: &[PeakStatistics]) {
    #[derive(Tabled)]
    struct StatRow {
        #[tabled(rename = "Peak")]
        peak: String,
        #[tabled(rename = "Column")]
        column: String,
        #[tabled(rename = "Average")]
        average: String,
        #[tabled(rename = "Std")]
        std: String,
    }

    let rows: Vec<StatRow> = stats
        .iter()
        .map(|s| StatRow {
            peak: s.peak.clone(),
            column: s.column.clone(),
            average: format!("{:.4}", s.average),
            std: format!("{:.4}", s.std),
        })
        .collect();

    if !rows.is_empty() {
        output::print_header("Peak Statistics");
        println!("{}", Table::new(&rows));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::table::DEFAULT_WAVELENGTH;

    fn args_for(dir: PathBuf) -> AggregateArgs {
        AggregateArgs {
            bases: vec![],
            dir: Some(dir.clone()),
            pattern: "*_params.txt".to_string(),
            peak_names: Some(vec!["D".to_string(), "G".to_string()]),
            sample_names: None,
            output_dir: dir.join("summary"),
            positions: false,
            ratios: true,
            wavelength: DEFAULT_WAVELENGTH,
        }
    }

    #[test]
    fn test_aggregate_directory() {
        let dir = tempfile::tempdir().unwrap();
        for (name, d, g) in [("s1", 0.8, 1.0), ("s2", 0.6, 0.5)] {
            let content = format!(
                "lz1center = 1350\nlz1fwhm = 100\nlz1height = {d}\n\
                 lz2center = 1590\nlz2fwhm = 60\nlz2height = {g}\n"
            );
            fs::write(dir.path().join(format!("{}_params.txt", name)), content).unwrap();
        }
        fs::write(dir.path().join("s1.txt"), "#X(µm)=1\n").unwrap();

        let args = args_for(dir.path().to_path_buf());
        let bases = resolve_bases(&args).unwrap();
        assert_eq!(bases, vec![dir.path().join("s1"), dir.path().join("s2")]);

        execute(args).unwrap();
        let summary = dir.path().join("summary");
        for file in [
            "table_results.csv",
            "statistics.txt",
            "statistics.csv",
            "intensity_ratios.txt",
            "crystallite_size.txt",
        ] {
            assert!(summary.join(file).exists(), "missing {}", file);
        }
        let ratios = fs::read_to_string(summary.join("intensity_ratios.txt")).unwrap();
        assert!(ratios.contains("s1 = 0.8"));
    }

    #[test]
    fn test_no_bases_is_error() {
        let mut args = args_for(PathBuf::from("unused"));
        args.dir = None;
        assert!(matches!(
            resolve_bases(&args),
            Err(RamanfitError::InvalidArgument(_))
        ));
    }
}
