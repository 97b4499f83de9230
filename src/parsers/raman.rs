//! # Raman 测量文件解析器
//!
//! ## 格式说明
//! ```text
//! #Laser (nm)=	532
//! #X (µm)=	-1250.5
//! 3200.12	1021.0
//! 3198.40	1019.5
//! ...
//! ```
//! 制表符分隔两列（波数、强度），`#` 之后为注释。
//!
//! ## 依赖关系
//! - 被 `fit/target.rs` 使用
//! - 使用 `parsers/header.rs` 读取头部
//! - 使用 `fit/preprocess.rs` 进行可选的归一化和去趋势

use crate::error::{RamanfitError, Result};
use crate::fit::preprocess;
use crate::models::{Metadata, Spectrum};
use crate::parsers::header::parse_header;

use std::fs;
use std::path::Path;

/// 读取后的可选处理
#[derive(Debug, Clone, Copy, Default)]
pub struct RamanReadOptions {
    /// 除以最大值（最大计数变为 1）
    pub normalize: bool,
    /// 去除线性趋势，主要用于可视化
    pub remove_offset: bool,
}

/// 解析 Raman 单点测量文件
pub fn read_raman_file(path: &Path, options: RamanReadOptions) -> Result<Spectrum> {
    let bytes = fs::read(path).map_err(|e| RamanfitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let content = String::from_utf8_lossy(&bytes);

    let (x, mut y) = parse_raman_columns(&content, &path.display().to_string())?;
    let header = parse_header(&content);

    if options.normalize {
        y = preprocess::normalize_to_max(&y);
    }
    if options.remove_offset {
        y = preprocess::detrend_linear(&y);
    }

    Ok(Spectrum::new(path, x, y, Metadata::Header(header)))
}

/// 解析制表符分隔的数据列
pub fn parse_raman_columns(content: &str, source: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut x = Vec::new();
    let mut y = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        let data = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        if data.trim().is_empty() {
            continue;
        }

        let mut fields = data.split('\t').map(str::trim);
        let (wavenumber, intensity) = match (fields.next(), fields.next()) {
            (Some(a), Some(b)) => (parse_field(a, source, lineno)?, parse_field(b, source, lineno)?),
            _ => {
                return Err(RamanfitError::ParseError {
                    format: "Raman".to_string(),
                    path: source.to_string(),
                    reason: format!("line {}: expected two tab-separated columns", lineno + 1),
                })
            }
        };

        x.push(wavenumber);
        y.push(intensity);
    }

    Ok((x, y))
}

fn parse_field(field: &str, source: &str, lineno: usize) -> Result<f64> {
    field.parse::<f64>().map_err(|_| RamanfitError::ParseError {
        format: "Raman".to_string(),
        path: source.to_string(),
        reason: format!("line {}: invalid number '{}'", lineno + 1, field),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "#Laser (nm)=\t532\n#X (µm)=\t-12.5\n#Y (µm)=\t3.0\n1000.0\t10.0\n1001.0\t20.0 # spike\n\n1002.0\t40.0\n";

    #[test]
    fn test_parse_columns() {
        let (x, y) = parse_raman_columns(SAMPLE, "test").unwrap();
        assert_eq!(x, vec![1000.0, 1001.0, 1002.0]);
        assert_eq!(y, vec![10.0, 20.0, 40.0]);
    }

    #[test]
    fn test_malformed_row_is_error() {
        let err = parse_raman_columns("1000.0\tabc\n", "test");
        assert!(matches!(err, Err(RamanfitError::ParseError { .. })));
        let err = parse_raman_columns("1000.0 10.0\n", "test");
        assert!(matches!(err, Err(RamanfitError::ParseError { .. })));
    }

    #[test]
    fn test_read_file_with_header() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let spectrum = read_raman_file(file.path(), RamanReadOptions::default()).unwrap();
        assert_eq!(spectrum.len(), 3);
        assert_eq!(spectrum.metadata.get("Laser(nm)"), Some("532"));
        assert_eq!(spectrum.metadata.get("X(µm)"), Some("-12.5"));
    }

    #[test]
    fn test_read_file_normalized() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let options = RamanReadOptions {
            normalize: true,
            remove_offset: false,
        };
        let spectrum = read_raman_file(file.path(), options).unwrap();
        assert_eq!(spectrum.y, vec![0.25, 0.5, 1.0]);
    }

    #[test]
    fn test_headerless_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"1000.0\t10.0\n1001.0\t20.0\n").unwrap();
        let spectrum = read_raman_file(file.path(), RamanReadOptions::default()).unwrap();
        assert_eq!(spectrum.metadata, Metadata::Header(Default::default()));
    }
}
