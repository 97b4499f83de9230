//! # 文本拟合报告
//!
//! 输出格式：
//! ```text
//! [[Model]]
//!     ((Model(quadratic, prefix='bkg') + Model(lorentzian, prefix='lz1')) + ...)
//! [[Fit Statistics]]
//!     # fitting method   = leastsq
//!     # function evals   = 153
//!     ...
//! [[Variables]]
//!     lz1center:     1351.20413 +/- 0.41225 (0.03%) (init = 1350)
//!     lz1fwhm:       81.4028 +/- 1.1 == '2.0000000*lz1sigma'
//! [[Correlations]] (unreported correlations are < 0.100)
//!     C(lz1amplitude, lz1sigma) = +0.8512
//! ```
//!
//! ## 依赖关系
//! - 被 `fit/pipeline.rs` 使用
//! - 使用 `fit/result.rs`

use crate::error::{RamanfitError, Result};
use crate::fit::result::{FitResult, MIN_CORRELATION};

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// 生成报告文本
pub fn fit_report(result: &FitResult) -> String {
    let mut out = String::new();
    let stats = &result.statistics;

    // writeln! 写入 String 不会失败
    let _ = writeln!(out, "[[Model]]");
    let _ = writeln!(out, "    {}", result.model);

    let _ = writeln!(out, "[[Fit Statistics]]");
    let _ = writeln!(out, "    # fitting method   = leastsq");
    let _ = writeln!(out, "    # function evals   = {}", stats.nfev);
    let _ = writeln!(out, "    # data points      = {}", stats.ndata);
    let _ = writeln!(out, "    # variables        = {}", stats.nvarys);
    let _ = writeln!(out, "    chi-square         = {}", gformat(stats.chisqr));
    let _ = writeln!(out, "    reduced chi-square = {}", gformat(stats.redchi));
    let _ = writeln!(out, "    Akaike info crit   = {}", gformat(stats.aic));
    let _ = writeln!(out, "    Bayesian info crit = {}", gformat(stats.bic));
    let _ = writeln!(out, "    R-squared          = {}", gformat(stats.rsquared));
    if !result.success {
        let _ = writeln!(out, "    ## Warning: fit did not converge: {}", result.message);
    }
    if !result.errorbars() {
        let _ = writeln!(out, "    ## Warning: uncertainties could not be estimated:");
    }

    let _ = writeln!(out, "[[Variables]]");
    let name_width = result
        .params
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0)
        + 1;

    for param in result.params.iter() {
        let label = format!("{}:", param.name);
        let mut line = format!("    {:<width$}  {}", label, gformat(param.value), width = name_width);

        match param.stderr {
            Some(stderr) => {
                let _ = write!(line, " +/- {}", gformat(stderr));
                if param.value != 0.0 {
                    let _ = write!(line, " ({:.2}%)", (stderr / param.value * 100.0).abs());
                }
            }
            None if param.expr.is_none() => line.push_str(" (fixed)"),
            None => {}
        }

        match &param.expr {
            Some(expr) => {
                let _ = write!(line, " == '{}'", expr);
            }
            None => {
                let _ = write!(line, " (init = {})", gformat(param.init));
            }
        }
        let _ = writeln!(out, "{}", line);
    }

    if !result.correlations.is_empty() {
        let _ = writeln!(
            out,
            "[[Correlations]] (unreported correlations are < {:.3})",
            MIN_CORRELATION
        );
        let labels: Vec<String> = result
            .correlations
            .iter()
            .map(|c| format!("C({}, {})", c.first, c.second))
            .collect();
        let width = labels.iter().map(|l| l.len()).max().unwrap_or(0);
        for (label, corr) in labels.iter().zip(&result.correlations) {
            let _ = writeln!(out, "    {:<width$} = {:+.4}", label, corr.value, width = width);
        }
    }

    out
}

/// 写出报告文件
pub fn write_fit_report(result: &FitResult, path: &Path) -> Result<()> {
    fs::write(path, fit_report(result)).map_err(|e| RamanfitError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 7 位有效数字的紧凑格式，整数值不带小数部分
pub fn gformat(value: f64) -> String {
    gformat_with(value, 7)
}

/// 与 printf `%.{precision}g` 相同的格式
pub fn gformat_with(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        let mantissa = trim_zeros(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
