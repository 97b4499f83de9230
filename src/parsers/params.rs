//! # 参数文件解析器
//!
//! 读取拟合阶段写出的 `{stem}_params.txt`：
//!
//! ```text
//! bkgslope = -0.00012
//! bkgslope_stderr = 1.3e-06
//! lz1center = 1351.2
//! lz1center_stderr = 0.41
//! ```
//!
//! 值按字符串保存，只有被请求的键才解析为数字；缺失或无法解析的键是致命错误。
//!
//! ## 依赖关系
//! - 被 `batch/table.rs` 使用
//! - 使用 `parsers/config.rs` 读取 key/value 文本
//! - 使用 `fit/model.rs` 的峰前缀统计峰数

use crate::error::{RamanfitError, Result};
use crate::fit::model::PEAK_PREFIX;
use crate::parsers::config::{parse_config_str, read_config_file, Section};

use std::path::{Path, PathBuf};

/// 一个样品的参数记录
#[derive(Debug, Clone)]
pub struct ParameterDump {
    pub path: PathBuf,
    section: Section,
}

impl ParameterDump {
    /// 读取参数文件
    pub fn read(path: &Path) -> Result<Self> {
        Ok(ParameterDump {
            path: path.to_path_buf(),
            section: read_config_file(path)?,
        })
    }

    /// 从字符串解析
    pub fn parse(content: &str, source: &Path) -> Result<Self> {
        Ok(ParameterDump {
            path: source.to_path_buf(),
            section: parse_config_str(content, &source.display().to_string())?,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.section.keys()
    }

    /// 读取一个数值
    pub fn value(&self, key: &str) -> Result<f64> {
        let raw = self
            .section
            .get(key)
            .ok_or_else(|| RamanfitError::MissingKey {
                key: key.to_string(),
                path: self.path.display().to_string(),
            })?;

        match raw.floats().as_deref() {
            Some([value]) => Ok(*value),
            _ => Err(RamanfitError::InvalidValue {
                key: key.to_string(),
                path: self.path.display().to_string(),
                value: raw.to_string(),
            }),
        }
    }

    /// 由键名中的最大编号推断峰数量，没有带编号的键时为 -1
    pub fn peak_count(&self) -> i64 {
        infer_peak_count(self.keys())
    }
}

/// 提取字符串中的所有数字并拼接为整数，没有数字时返回 -1
pub fn get_num(s: &str) -> i64 {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().unwrap_or(-1)
}

/// 键集合中最大的峰编号，只看 `lz` 前缀的键
pub fn infer_peak_count<'a, I>(keys: I) -> i64
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter()
        .filter(|key| key.starts_with(PEAK_PREFIX))
        .map(get_num)
        .max()
        .unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_num() {
        assert_eq!(get_num("lz12center"), 12);
        assert_eq!(get_num("lz1center_stderr"), 1);
        assert_eq!(get_num("bkgslope"), -1);
        assert_eq!(get_num("bkgc0"), 0);
    }

    #[test]
    fn test_infer_peak_count() {
        let keys = ["lz1fwhm", "lz1center", "lz2fwhm", "lz2center"];
        assert_eq!(infer_peak_count(keys), 2);
        assert_eq!(infer_peak_count(["bkgslope", "bkgintercept"]), -1);
    }

    #[test]
    fn test_peak_count_ignores_background_digits() {
        let keys = ["bkgc0", "bkgc1", "bkgc2", "bkgc3", "lz1center", "lz2center"];
        assert_eq!(infer_peak_count(keys), 2);
        assert_eq!(infer_peak_count(["bkgc0", "bkgc3"]), -1);
    }

    #[test]
    fn test_value_lookup() {
        let content = "lz1center = 1351.2\nlz1center_stderr = None\nlz1height = nan\n";
        let dump = ParameterDump::parse(content, Path::new("s1_params.txt")).unwrap();
        assert_eq!(dump.value("lz1center").unwrap(), 1351.2);
        assert!(dump.value("lz1height").unwrap().is_nan());
        assert!(matches!(
            dump.value("lz1center_stderr"),
            Err(RamanfitError::InvalidValue { .. })
        ));
        assert!(matches!(
            dump.value("lz2center"),
            Err(RamanfitError::MissingKey { .. })
        ));
        assert_eq!(dump.peak_count(), 1);
    }
}
