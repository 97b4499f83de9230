//! # 光谱数据模型
//!
//! 一维测量数据：x 为波数 (Raman) 或 2θ 角 (XRD)，y 为强度。
//!
//! ## 依赖关系
//! - 被 `parsers/raman.rs`, `parsers/xrd.rs` 创建
//! - 被 `fit/` 和 `report/` 使用

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 光谱类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpectrumKind {
    Raman,
    Xrd,
}

impl std::fmt::Display for SpectrumKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpectrumKind::Raman => write!(f, "Raman"),
            SpectrumKind::Xrd => write!(f, "XRD"),
        }
    }
}

/// 测量文件的元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Metadata {
    /// Raman 文件头部的 key=value 信息（仪器设置、空间坐标）
    Header(BTreeMap<String, String>),
    /// XRD 文件没有结构化头部，只保留去掉扩展名的文件名
    BaseName(String),
}

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            Metadata::Header(map) => map.get(key).map(|s| s.as_str()),
            Metadata::BaseName(_) => None,
        }
    }
}

/// 一条光谱
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// 来源文件路径
    pub source: PathBuf,

    /// 横坐标
    pub x: Vec<f64>,

    /// 强度
    pub y: Vec<f64>,

    pub metadata: Metadata,
}

impl Spectrum {
    pub fn new(source: impl Into<PathBuf>, x: Vec<f64>, y: Vec<f64>, metadata: Metadata) -> Self {
        Spectrum {
            source: source.into(),
            x,
            y,
            metadata,
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// 去掉扩展名的来源路径，所有输出文件都以它命名
    pub fn stem(&self) -> PathBuf {
        output_stem(&self.source)
    }

    /// 用于图表标题的短名称
    pub fn name(&self) -> String {
        self.source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("spectrum")
            .to_string()
    }
}

/// 去掉扩展名的路径
pub fn output_stem(path: &Path) -> PathBuf {
    path.with_extension("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_strips_extension() {
        let spectrum = Spectrum::new(
            "data/sample_01.txt",
            vec![1.0],
            vec![2.0],
            Metadata::BaseName("data/sample_01".to_string()),
        );
        assert_eq!(spectrum.stem(), PathBuf::from("data/sample_01"));
        assert_eq!(spectrum.name(), "sample_01");
    }

    #[test]
    fn test_metadata_lookup() {
        let mut header = BTreeMap::new();
        header.insert("X(µm)".to_string(), "12.5".to_string());
        let meta = Metadata::Header(header);
        assert_eq!(meta.get("X(µm)"), Some("12.5"));
        assert_eq!(meta.get("Y(µm)"), None);
        assert_eq!(Metadata::BaseName("a".into()).get("X(µm)"), None);
    }
}
