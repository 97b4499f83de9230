//! # 拟合参数数据模型
//!
//! 带上下界的命名参数集合。参数名遵循 `{组件前缀}{参数名}`，例如
//! `lz1center`、`bkgslope`。派生参数（fwhm、height）带有表达式，不参与优化。
//!
//! ## 依赖关系
//! - 被 `fit/` 和 `report/` 使用
//! - 使用 `error.rs`

use crate::error::{RamanfitError, Result};
use serde::{Deserialize, Serialize};

/// 单个拟合参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    /// 当前值（拟合后为最优值）
    pub value: f64,

    /// 初值
    pub init: f64,

    pub min: f64,
    pub max: f64,

    /// 是否参与优化
    pub vary: bool,

    /// 标准误差，协方差不可用时为 None
    pub stderr: Option<f64>,

    /// 派生参数的表达式（仅用于报告）
    pub expr: Option<String>,
}

impl Parameter {
    /// 无界的自由参数
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Parameter {
            name: name.into(),
            value,
            init: value,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            vary: true,
            stderr: None,
            expr: None,
        }
    }

    /// 设置上下界，初值超出范围时截断到边界
    ///
    /// NaN 视为无界；上下界颠倒时交换。
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        let min = if min.is_nan() { f64::NEG_INFINITY } else { min };
        let max = if max.is_nan() { f64::INFINITY } else { max };
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        self.min = min;
        self.max = max;
        self.value = self.value.max(min).min(max);
        self.init = self.value;
        self
    }

    /// 派生参数
    pub fn derived(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Parameter {
            vary: false,
            expr: Some(expr.into()),
            ..Parameter::new(name, 0.0)
        }
    }

    /// 是否由优化器调整
    pub fn is_free(&self) -> bool {
        self.vary && self.expr.is_none()
    }
}

/// 有序参数集合，名称唯一
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    items: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加参数，重名时报错
    pub fn add(&mut self, param: Parameter) -> Result<usize> {
        if self.index_of(&param.name).is_some() {
            return Err(RamanfitError::DuplicateParameter(param.name));
        }
        self.items.push(param);
        Ok(self.items.len() - 1)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.items.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 所有参数当前值，顺序与集合一致
    pub fn values(&self) -> Vec<f64> {
        self.items.iter().map(|p| p.value).collect()
    }

    /// 自由参数在集合中的下标
    pub fn free_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_free())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn at(&self, index: usize) -> &Parameter {
        &self.items[index]
    }

    pub fn at_mut(&mut self, index: usize) -> &mut Parameter {
        &mut self.items[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rejected() {
        let mut params = Parameters::new();
        params.add(Parameter::new("lz1center", 1350.0)).unwrap();
        let err = params.add(Parameter::new("lz1center", 1580.0));
        assert!(matches!(err, Err(RamanfitError::DuplicateParameter(_))));
        assert_eq!(params.get("lz1center").unwrap().value, 1350.0);
    }

    #[test]
    fn test_bounds_clip_initial_value() {
        let p = Parameter::new("lz1amplitude", 250.0).with_bounds(0.0, 200.0);
        assert_eq!(p.value, 200.0);
        assert_eq!(p.init, 200.0);
    }

    #[test]
    fn test_reversed_bounds_swapped() {
        let p = Parameter::new("lz1amplitude", 250.0).with_bounds(200.0, 0.0);
        assert_eq!((p.min, p.max), (0.0, 200.0));
        assert_eq!(p.value, 200.0);
    }

    #[test]
    fn test_nan_bound_is_open() {
        let p = Parameter::new("lz1sigma", 40.0).with_bounds(f64::NAN, 10.0);
        assert_eq!(p.min, f64::NEG_INFINITY);
        assert_eq!(p.max, 10.0);
        assert_eq!(p.value, 10.0);

        let p = Parameter::new("lz1sigma", 4.0).with_bounds(f64::NAN, f64::NAN);
        assert!(!p.min.is_finite() && !p.max.is_finite());
        assert_eq!(p.value, 4.0);
    }

    #[test]
    fn test_free_indices_skip_derived() {
        let mut params = Parameters::new();
        params.add(Parameter::new("lz1sigma", 10.0)).unwrap();
        params
            .add(Parameter::derived("lz1fwhm", "2.0000000*lz1sigma"))
            .unwrap();
        params.add(Parameter::new("lz1center", 1350.0)).unwrap();
        assert_eq!(params.free_indices(), vec![0, 2]);
    }
}
