//! # 参数文件写出
//!
//! 每个参数两行：
//! ```text
//! lz1center = 1351.2041
//! lz1center_stderr = 0.41225
//! ```
//! 标准误差未知时写 `None`。该文件由 `aggregate` 命令重新读取。
//!
//! ## 依赖关系
//! - 被 `fit/pipeline.rs` 使用
//! - 输出由 `parsers/params.rs` 解析

use crate::error::{RamanfitError, Result};
use crate::models::Parameters;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// 参数文件后缀
pub const PARAMS_SUFFIX: &str = "_params.txt";

/// 生成参数文件内容
pub fn params_dump(params: &Parameters) -> String {
    let mut out = String::new();
    for param in params.iter() {
        let _ = writeln!(out, "{} = {}", param.name, param.value);
        match param.stderr {
            Some(stderr) => {
                let _ = writeln!(out, "{}_stderr = {}", param.name, stderr);
            }
            None => {
                let _ = writeln!(out, "{}_stderr = None", param.name);
            }
        }
    }
    out
}

/// 写出参数文件
pub fn write_params_dump(params: &Parameters, path: &Path) -> Result<()> {
    fs::write(path, params_dump(params)).map_err(|e| RamanfitError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Parameter;
    use crate::parsers::params::ParameterDump;

    #[test]
    fn test_dump_round_trip() {
        let mut params = Parameters::new();
        params.add(Parameter::new("bkgslope", -1.25e-7)).unwrap();
        params.add(Parameter::new("lz1center", 1351.2041)).unwrap();
        params.add(Parameter::new("lz1fwhm", 81.40287)).unwrap();
        params.add(Parameter::new("lz2height", 0.9731)).unwrap();
        params.at_mut(1).stderr = Some(0.41225);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("sample{}", PARAMS_SUFFIX));
        write_params_dump(&params, &path).unwrap();

        let dump = ParameterDump::read(&path).unwrap();
        for param in params.iter() {
            assert_eq!(dump.value(&param.name).unwrap(), param.value);
        }
        assert_eq!(dump.value("lz1center_stderr").unwrap(), 0.41225);
        assert!(dump.value("bkgslope_stderr").is_err());
        assert_eq!(dump.peak_count(), 2);
    }
}
