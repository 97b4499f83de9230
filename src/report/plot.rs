//! # 拟合结果图表
//!
//! 使用 `plotters` 绘制数据、最优拟合曲线以及每个组件（虚线）。
//! 常数背景绘制为水平虚线。
//!
//! 样式通过 `PlotStyle` 显式传入，不修改任何全局状态。
//!
//! ## 依赖关系
//! - 被 `fit/pipeline.rs` 调用
//! - 使用 `fit/result.rs`, `fit/model.rs` 的组件曲线
//! - 使用 `plotters` 渲染图表

use crate::error::{RamanfitError, Result};
use crate::fit::model::ComponentCurve;

use plotters::prelude::*;
use std::path::Path;

/// 图表样式
#[derive(Debug, Clone)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub font_family: String,
    pub label_font_size: u32,
    pub axis_font_size: u32,
    pub line_width: u32,
    /// 数据、拟合曲线之后依次用于各组件的颜色
    pub palette: Vec<RGBColor>,
    /// 输出 SVG 而不是 PNG
    pub svg: bool,
}

impl Default for PlotStyle {
    fn default() -> Self {
        PlotStyle {
            width: 1200,
            height: 800,
            font_family: "sans-serif".to_string(),
            label_font_size: 16,
            axis_font_size: 18,
            line_width: 2,
            palette: vec![
                RGBColor(31, 119, 180),
                RGBColor(255, 127, 14),
                RGBColor(44, 160, 44),
                RGBColor(214, 39, 40),
                RGBColor(148, 103, 189),
                RGBColor(140, 86, 75),
                RGBColor(227, 119, 194),
                RGBColor(127, 127, 127),
                RGBColor(188, 189, 34),
                RGBColor(23, 190, 207),
            ],
            svg: false,
        }
    }
}

impl PlotStyle {
    /// 输出文件扩展名
    pub fn extension(&self) -> &'static str {
        if self.svg {
            "svg"
        } else {
            "png"
        }
    }

    fn color(&self, index: usize) -> RGBColor {
        if self.palette.is_empty() {
            BLACK
        } else {
            self.palette[index % self.palette.len()]
        }
    }
}

/// 一张拟合图的数据
#[derive(Debug, Clone, Copy)]
pub struct FitPlot<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub best_fit: &'a [f64],
    pub components: &'a [(String, ComponentCurve)],
    pub x_label: &'a str,
    pub y_label: &'a str,
}

/// 生成拟合图
pub fn generate_fit_plot(plot: &FitPlot<'_>, output_path: &Path, style: &PlotStyle) -> Result<()> {
    if style.svg {
        let root = SVGBackend::new(output_path, (style.width, style.height)).into_drawing_area();
        draw_fit_chart(&root, plot, style)?;
        root.present()
            .map_err(|e| RamanfitError::PlotError(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (style.width, style.height)).into_drawing_area();
        draw_fit_chart(&root, plot, style)?;
        root.present()
            .map_err(|e| RamanfitError::PlotError(e.to_string()))?;
    }
    Ok(())
}

/// 所有曲线的 (min, max)，两端各留 5% 空白
fn value_range(plot: &FitPlot<'_>) -> (f64, f64) {
    let mut values: Vec<f64> = plot.y.iter().chain(plot.best_fit).copied().collect();
    for (_, component) in plot.components {
        match component {
            ComponentCurve::Curve(curve) => values.extend(curve),
            ComponentCurve::Scalar(v) => values.push(*v),
        }
    }

    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(1e-12);
    (min - pad, max + pad)
}

fn x_range(x: &[f64]) -> (f64, f64) {
    let (min, max) = x
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || min == max {
        (min.min(0.0), max.max(1.0))
    } else {
        (min, max)
    }
}

fn draw_fit_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    plot: &FitPlot<'_>,
    style: &PlotStyle,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| RamanfitError::PlotError(format!("{:?}", e)))?;

    let (x_min, x_max) = x_range(plot.x);
    let (y_min, y_max) = value_range(plot);
    let font = style.font_family.as_str();

    let mut chart = ChartBuilder::on(root)
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| RamanfitError::PlotError(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(plot.x_label)
        .y_desc(plot.y_label)
        .x_label_style((font, style.label_font_size))
        .y_label_style((font, style.label_font_size))
        .axis_desc_style((font, style.axis_font_size))
        .draw()
        .map_err(|e| RamanfitError::PlotError(format!("{:?}", e)))?;

    let points = |values: &[f64]| -> Vec<(f64, f64)> {
        plot.x.iter().copied().zip(values.iter().copied()).collect()
    };

    let series: Vec<(&str, Vec<(f64, f64)>, bool)> = std::iter::once(("data", points(plot.y), false))
        .chain(std::iter::once(("best fit", points(plot.best_fit), false)))
        .chain(plot.components.iter().map(|(name, component)| {
            let line = match component {
                ComponentCurve::Curve(curve) => points(curve),
                ComponentCurve::Scalar(v) => vec![(x_min, *v), (x_max, *v)],
            };
            (name.as_str(), line, true)
        }))
        .collect();

    for (i, (name, line, dashed)) in series.into_iter().enumerate() {
        let line_style = style.color(i).stroke_width(style.line_width);
        let legend_style = line_style;

        let anno = if dashed {
            chart.draw_series(DashedLineSeries::new(line, 10, 6, line_style))
        } else {
            chart.draw_series(LineSeries::new(line, line_style))
        }
        .map_err(|e| RamanfitError::PlotError(format!("{:?}", e)))?;

        anno.label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], legend_style));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((font, style.label_font_size))
        .draw()
        .map_err(|e| RamanfitError::PlotError(format!("{:?}", e)))?;

    Ok(())
}
