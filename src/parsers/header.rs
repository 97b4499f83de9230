//! # 测量文件头部解析器
//!
//! Raman 测量文件以若干 `#` 开头的行作为头部，每行一个 `key=value`：
//!
//! ```text
//! #Acq. time (s)=	1
//! #X (µm)=	-1250.5
//! #Y (µm)=	340.2
//! 1800.5	1203.0
//! ```
//!
//! 清理规则：去掉 `#` 和换行，制表符变为空格，再去掉所有空格。
//! 没有 `=` 的行被跳过，头部缺失不是错误。
//!
//! ## 依赖关系
//! - 被 `parsers/raman.rs`, `batch/table.rs` 使用

use crate::error::{RamanfitError, Result};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// 空间坐标在头部中的键名（单位 µm）
pub const POSITION_KEYS: [&str; 3] = ["X(µm)", "Y(µm)", "Z(µm)"];

/// 清理头部行
pub fn cleanup_header<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| {
            line.as_ref()
                .replace('#', "")
                .replace('\n', "")
                .replace('\t', " ")
                .replace(' ', "")
        })
        .collect()
}

/// 从文件内容解析头部：只取文件开头连续的 `#` 行
pub fn parse_header(content: &str) -> BTreeMap<String, String> {
    let header_lines = content.lines().take_while(|line| line.starts_with('#'));

    cleanup_header(header_lines)
        .into_iter()
        .filter_map(|element| {
            element
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect()
}

/// 读取测量文件头部，无法解码的字节被替换
pub fn read_header(path: &Path) -> Result<BTreeMap<String, String>> {
    let bytes = fs::read(path).map_err(|e| RamanfitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_header(&String::from_utf8_lossy(&bytes)))
}

/// 头部中的 x/y/z 坐标，缺失或无法解析时为 NaN
pub fn positions(header: &BTreeMap<String, String>) -> [f64; 3] {
    POSITION_KEYS.map(|key| {
        header
            .get(key)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(f64::NAN)
    })
}

/// 读取测量文件中的坐标
pub fn read_positions(path: &Path) -> Result<[f64; 3]> {
    Ok(positions(&read_header(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_header() {
        let data = ["# hello", "\t,# ciao"];
        assert_eq!(cleanup_header(data), vec!["hello", ",ciao"]);
    }

    #[test]
    fn test_parse_header() {
        let content = "#Acq. time (s)=\t1\n#X (µm)=\t-1250.5\n#Y (µm)=\t340.2\n#no equals sign\n1800.5\t1203.0\n#late comment=1\n";
        let header = parse_header(content);
        assert_eq!(header.get("Acq.time(s)").map(String::as_str), Some("1"));
        assert_eq!(header.get("X(µm)").map(String::as_str), Some("-1250.5"));
        assert!(!header.contains_key("late comment"));
        assert!(!header.contains_key("latecomment"));
        assert_eq!(header.len(), 3);
    }

    #[test]
    fn test_value_keeps_later_equals() {
        let header = parse_header("#formula=a=b\n");
        assert_eq!(header.get("formula").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_positions_default_to_nan() {
        let header = parse_header("#X (µm)=\t12.5\n#Z (µm)=\tabc\n");
        let [x, y, z] = positions(&header);
        assert_eq!(x, 12.5);
        assert!(y.is_nan());
        assert!(z.is_nan());

        let [x, y, z] = positions(&parse_header("1.0\t2.0\n"));
        assert!(x.is_nan() && y.is_nan() && z.is_nan());
    }
}
