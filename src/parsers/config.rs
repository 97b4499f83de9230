//! # 峰配置文件解析器
//!
//! 读写 ConfigObj 风格的 key/value 文本文件。
//!
//! ## 格式说明
//! ```text
//! # 注释
//! peaks = 1350, 1580
//!
//! [other data]
//! window_size = 15
//! poly_type = linear
//! min_max_amplitude = 0, 200
//!
//! [D]
//!     [[fwhm]]
//!         average = 55.1
//! ```
//!
//! 逗号分隔的值解析为列表（末尾逗号表示单元素列表），值两侧的引号会被去掉。
//! 同一个读写器也用于参数文件和汇总结果文件。
//!
//! ## 依赖关系
//! - 被 `fit/pipeline.rs`, `parsers/params.rs`, `report/summary.rs` 使用
//! - 使用 `models/options.rs`
//! - 使用 `regex` 识别段标题和键值行

use crate::error::{RamanfitError, Result};
use crate::models::{FitOptions, SpectrumKind};

use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

const RAMAN_DEFAULT_PEAKS: &str = include_str!("../../defaults/raman_linear_carbon.ini");
const XRD_DEFAULT_PEAKS: &str = include_str!("../../defaults/xrd_linear_carbon.ini");

/// `[other data]` 段名
pub const OTHER_DATA_SECTION: &str = "other data";

/// 配置值：标量或列表
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Scalar(String),
    List(Vec<String>),
}

impl ConfigValue {
    /// 所有元素（标量视为单元素）
    pub fn items(&self) -> Vec<&str> {
        match self {
            ConfigValue::Scalar(s) => vec![s.as_str()],
            ConfigValue::List(items) => items.iter().map(|s| s.as_str()).collect(),
        }
    }

    /// 全部元素解析为浮点数，任一失败返回 None
    pub fn floats(&self) -> Option<Vec<f64>> {
        self.items()
            .iter()
            .map(|s| s.trim().parse::<f64>().ok())
            .collect()
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Scalar(s) => write!(f, "{}", quote_if_needed(s)),
            ConfigValue::List(items) if items.len() == 1 => {
                write!(f, "{},", quote_if_needed(&items[0]))
            }
            ConfigValue::List(items) => {
                let quoted: Vec<String> = items.iter().map(|s| quote_if_needed(s)).collect();
                write!(f, "{}", quoted.join(", "))
            }
        }
    }
}

/// 配置段，根段名称为空
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub name: String,
    entries: Vec<(String, ConfigValue)>,
    sections: Vec<Section>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Section {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// 设置键值，已存在时替换（保持原位置）
    pub fn set(&mut self, key: impl Into<String>, value: ConfigValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn set_scalar(&mut self, key: impl Into<String>, value: impl ToString) {
        self.set(key, ConfigValue::Scalar(value.to_string()));
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// 追加子段，同名时替换
    pub fn add_section(&mut self, section: Section) {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    fn child_mut(&mut self, path: &[usize]) -> &mut Section {
        let mut section = self;
        for &idx in path {
            section = &mut section.sections[idx];
        }
        section
    }
}

fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\[+)\s*([^\[\]]+?)\s*(\]+)\s*(#.*)?$").unwrap())
}

fn entry_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([^=\[]+?)\s*=\s*(.*)$").unwrap())
}

// ─────────────────────────────────────────────────────────────
// 读取
// ─────────────────────────────────────────────────────────────

/// 读取配置文件
pub fn read_config_file(path: &Path) -> Result<Section> {
    let content = fs::read_to_string(path).map_err(|e| RamanfitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_config_str(&content, &path.display().to_string())
}

/// 从字符串解析配置
pub fn parse_config_str(content: &str, source: &str) -> Result<Section> {
    let mut root = Section::new("");
    let mut current: Vec<usize> = Vec::new();

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(caps) = section_re().captures(line) {
            let depth = caps[1].len();
            if depth != caps[3].len() || depth > current.len() + 1 {
                return Err(parse_error(source, lineno, "unbalanced section marker"));
            }
            let name = strip_quotes(caps[2].trim()).to_string();
            current.truncate(depth - 1);

            let parent = root.child_mut(&current);
            let idx = match parent.sections.iter().position(|s| s.name == name) {
                Some(idx) => idx,
                None => {
                    parent.sections.push(Section::new(name));
                    parent.sections.len() - 1
                }
            };
            current.push(idx);
            continue;
        }

        if let Some(caps) = entry_re().captures(line) {
            let key = strip_quotes(caps[1].trim()).to_string();
            let value = parse_value(&caps[2]);
            root.child_mut(&current).set(key, value);
            continue;
        }

        return Err(parse_error(source, lineno, &format!("invalid line '{}'", line)));
    }

    Ok(root)
}

fn parse_error(source: &str, lineno: usize, reason: &str) -> RamanfitError {
    RamanfitError::ParseError {
        format: "config".to_string(),
        path: source.to_string(),
        reason: format!("line {}: {}", lineno + 1, reason),
    }
}

/// 解析值部分：处理引号、行内注释和逗号列表
fn parse_value(raw: &str) -> ConfigValue {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut has_comma = false;

    for c in raw.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                '#' => break,
                ',' => {
                    has_comma = true;
                    items.push(strip_quotes(current.trim()).to_string());
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }

    let last = strip_quotes(current.trim()).to_string();
    if has_comma {
        if !last.is_empty() {
            items.push(last);
        }
        ConfigValue::List(items)
    } else {
        ConfigValue::Scalar(last)
    }
}

fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn quote_if_needed(s: &str) -> String {
    if s.contains([',', '#', '"']) || s.trim() != s {
        format!("'{}'", s)
    } else {
        s.to_string()
    }
}

// ─────────────────────────────────────────────────────────────
// 写入
// ─────────────────────────────────────────────────────────────

/// 序列化为 ConfigObj 文本（制表符缩进）
pub fn to_config_string(root: &Section) -> String {
    let mut out = String::new();
    write_section_body(&mut out, root, 0);
    out
}

fn write_section_body(out: &mut String, section: &Section, depth: usize) {
    let indent = "\t".repeat(depth);
    for (key, value) in &section.entries {
        out.push_str(&format!("{}{} = {}\n", indent, key, value));
    }
    for child in &section.sections {
        let marker_depth = depth + 1;
        out.push_str(&format!(
            "{}{}{}{}\n",
            "\t".repeat(depth),
            "[".repeat(marker_depth),
            child.name,
            "]".repeat(marker_depth)
        ));
        write_section_body(out, child, marker_depth);
    }
}

/// 写入配置文件
pub fn write_config_file(root: &Section, path: &Path) -> Result<()> {
    fs::write(path, to_config_string(root)).map_err(|e| RamanfitError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

// ─────────────────────────────────────────────────────────────
// 峰列表与拟合选项
// ─────────────────────────────────────────────────────────────

/// 读取峰中心列表（升序）。
///
/// 文件缺失、无法解析或没有有效的 `peaks` 项时，记录日志并改用内置默认峰文件，
/// 不会返回错误。
pub fn read_peaks_config(path: Option<&Path>, kind: SpectrumKind) -> Vec<f64> {
    let Some(path) = path else {
        log::info!("No peaks file given, using the bundled {} defaults", kind);
        return default_peaks(kind);
    };

    match read_config_file(path).and_then(|doc| peaks_from(&doc, &path.display().to_string())) {
        Ok(peaks) => peaks,
        Err(e) => {
            log::warn!(
                "Data peaks not found or corrupted ({}), using the bundled {} defaults",
                e,
                kind
            );
            default_peaks(kind)
        }
    }
}

/// 内置默认峰
pub fn default_peaks(kind: SpectrumKind) -> Vec<f64> {
    let (content, name) = match kind {
        SpectrumKind::Raman => (RAMAN_DEFAULT_PEAKS, "raman_linear_carbon.ini"),
        SpectrumKind::Xrd => (XRD_DEFAULT_PEAKS, "xrd_linear_carbon.ini"),
    };
    match parse_config_str(content, name).and_then(|doc| peaks_from(&doc, name)) {
        Ok(peaks) => peaks,
        Err(e) => {
            log::error!("Bundled peaks file is unreadable: {}", e);
            Vec::new()
        }
    }
}

fn peaks_from(doc: &Section, source: &str) -> Result<Vec<f64>> {
    let value = doc.get("peaks").ok_or_else(|| RamanfitError::MissingKey {
        key: "peaks".to_string(),
        path: source.to_string(),
    })?;

    let mut peaks = value.floats().ok_or_else(|| RamanfitError::InvalidValue {
        key: "peaks".to_string(),
        path: source.to_string(),
        value: value.to_string(),
    })?;

    if peaks.is_empty() {
        return Err(RamanfitError::InvalidValue {
            key: "peaks".to_string(),
            path: source.to_string(),
            value: String::new(),
        });
    }

    peaks.sort_by(f64::total_cmp);
    Ok(peaks)
}

/// 读取 `[other data]` 段，文件或段不存在时返回 None
pub fn read_other_data(path: Option<&Path>) -> Option<Section> {
    let path = path?;
    match read_config_file(path) {
        Ok(doc) => doc.section(OTHER_DATA_SECTION).cloned(),
        Err(e) => {
            log::info!("No '{}' section available: {}", OTHER_DATA_SECTION, e);
            None
        }
    }
}

/// 将 `[other data]` 段转换为显式选项结构。
///
/// 格式错误的值按缺失处理（记录日志），未识别的键忽略。
pub fn parse_fit_options(section: Option<&Section>) -> FitOptions {
    let mut options = FitOptions::default();
    let Some(section) = section else {
        return options;
    };

    for (key, value) in section.entries() {
        match key {
            "window_size" => options.window_size = scalar(key, value).and_then(to_count),
            "poly_order" => options.poly_order = scalar(key, value).and_then(to_count),
            "poly_type" => {
                options.poly_type = value.items().first().map(|s| s.trim().to_string())
            }
            "min_max_amplitude" => options.min_max_amplitude = pair(key, value),
            "min_max_sigma" => options.min_max_sigma = pair(key, value),
            "peak_center_tolerance" => {
                options.peak_center_tolerance = scalar(key, value).filter(|&tol| {
                    let ok = tol >= 0.0;
                    if !ok {
                        log::warn!("Negative tolerance for '{}': {}, ignoring", key, tol);
                    }
                    ok
                })
            }
            "amplitude" => options.amplitude = scalar(key, value),
            "sigma" => options.sigma = scalar(key, value),
            other => log::debug!("Ignoring unrecognized option '{}'", other),
        }
    }

    options
}

fn scalar(key: &str, value: &ConfigValue) -> Option<f64> {
    match value.floats().as_deref() {
        Some([first, ..]) if first.is_finite() => Some(*first),
        _ => {
            log::warn!("Malformed value for '{}': '{}', ignoring", key, value);
            None
        }
    }
}

fn pair(key: &str, value: &ConfigValue) -> Option<(f64, f64)> {
    match value.floats().as_deref() {
        Some([min, max, ..]) if min.is_finite() && max.is_finite() => {
            if min > max {
                log::warn!("Reversed range for '{}': '{}', ignoring", key, value);
                return None;
            }
            Some((*min, *max))
        }
        _ => {
            log::warn!("Malformed range for '{}': '{}', ignoring", key, value);
            None
        }
    }
}

fn to_count(v: f64) -> Option<usize> {
    (v.is_finite() && v >= 0.0).then(|| v as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_lists_and_sections() {
        let content = r#"
# peaks for a carbon sample
peaks = 1580, 1350  # G first on purpose

[other data]
window_size = 21
poly_type = 'cubic'
min_max_amplitude = 0, 500
single = 3,
"#;
        let doc = parse_config_str(content, "test").unwrap();
        assert_eq!(
            doc.get("peaks"),
            Some(&ConfigValue::List(vec!["1580".into(), "1350".into()]))
        );
        let other = doc.section("other data").unwrap();
        assert_eq!(
            other.get("window_size"),
            Some(&ConfigValue::Scalar("21".into()))
        );
        assert_eq!(
            other.get("poly_type"),
            Some(&ConfigValue::Scalar("cubic".into()))
        );
        assert_eq!(
            other.get("single"),
            Some(&ConfigValue::List(vec!["3".into()]))
        );
    }

    #[test]
    fn test_nested_sections() {
        let content = "[D]\n\t[[fwhm]]\n\t\taverage = 1.5\n\t\tstd = 0.1\n[G]\n\t[[fwhm]]\n\t\taverage = 2.5\n";
        let doc = parse_config_str(content, "test").unwrap();
        let d = doc.section("D").unwrap().section("fwhm").unwrap();
        assert_eq!(d.get("average"), Some(&ConfigValue::Scalar("1.5".into())));
        let g = doc.section("G").unwrap().section("fwhm").unwrap();
        assert_eq!(g.get("average"), Some(&ConfigValue::Scalar("2.5".into())));
    }

    #[test]
    fn test_invalid_line_is_error() {
        let err = parse_config_str("peaks 1350", "test");
        assert!(matches!(err, Err(RamanfitError::ParseError { .. })));
    }

    #[test]
    fn test_write_then_read() {
        let mut root = Section::new("");
        root.set_scalar("sample_01", 0.85);
        let mut peak = Section::new("D");
        let mut column = Section::new("height");
        column.set_scalar("average", 0.5);
        column.set_scalar("std", 0.01);
        peak.add_section(column);
        root.add_section(peak);

        let text = to_config_string(&root);
        assert_eq!(
            text,
            "sample_01 = 0.85\n[D]\n\t[[height]]\n\t\taverage = 0.5\n\t\tstd = 0.01\n"
        );
        assert_eq!(parse_config_str(&text, "test").unwrap(), root);
    }

    #[test]
    fn test_peaks_sorted_ascending() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "peaks = 1580, 1350, 2700").unwrap();
        let peaks = read_peaks_config(Some(file.path()), SpectrumKind::Raman);
        assert_eq!(peaks, vec![1350.0, 1580.0, 2700.0]);
    }

    #[test]
    fn test_missing_peaks_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[other data]\nwindow_size = 11").unwrap();
        let peaks = read_peaks_config(Some(file.path()), SpectrumKind::Raman);
        assert_eq!(peaks, default_peaks(SpectrumKind::Raman));

        let peaks = read_peaks_config(
            Some(Path::new("/nonexistent/peaks.ini")),
            SpectrumKind::Xrd,
        );
        assert_eq!(peaks, vec![26.0, 43.0]);
    }

    #[test]
    fn test_corrupted_peaks_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "peaks = 1350, G").unwrap();
        let peaks = read_peaks_config(Some(file.path()), SpectrumKind::Raman);
        assert_eq!(peaks, vec![1350.0, 1580.0]);
    }

    #[test]
    fn test_parse_fit_options() {
        let content = r#"
[other data]
window_size = 11
poly_order = 2.0
poly_type = Linear
min_max_amplitude = 0, 500
min_max_sigma = 1
peak_center_tolerance = 20
sigma = abc
unknown_key = 1
"#;
        let doc = parse_config_str(content, "test").unwrap();
        let options = parse_fit_options(doc.section(OTHER_DATA_SECTION));
        assert_eq!(options.window_size, Some(11));
        assert_eq!(options.poly_order, Some(2));
        assert_eq!(options.poly_type.as_deref(), Some("Linear"));
        assert_eq!(options.min_max_amplitude, Some((0.0, 500.0)));
        assert_eq!(options.min_max_sigma, None);
        assert_eq!(options.peak_center_tolerance, Some(20.0));
        assert_eq!(options.amplitude, None);
        assert_eq!(options.sigma, None);
    }

    #[test]
    fn test_bad_ranges_fall_back_to_defaults() {
        let content = r#"
[other data]
min_max_amplitude = 200, 0
min_max_sigma = nan, 10
peak_center_tolerance = -5
amplitude = inf
"#;
        let doc = parse_config_str(content, "test").unwrap();
        let options = parse_fit_options(doc.section(OTHER_DATA_SECTION));
        assert_eq!(options.min_max_amplitude, None);
        assert_eq!(options.min_max_sigma, None);
        assert_eq!(options.peak_center_tolerance, None);
        assert_eq!(options.amplitude, None);
    }

    #[test]
    fn test_other_data_absent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "peaks = 1350").unwrap();
        assert!(read_other_data(Some(file.path())).is_none());
        assert!(read_other_data(None).is_none());
        assert_eq!(parse_fit_options(None), FitOptions::default());
    }
}
