//! Figure rendering for aggregation tables.
//!
//! Rendering sits behind [`ChartRenderer`] so callers can swap or stub it.
//! The default renderer writes SVG documents with `plotters`.

use std::path::{Path, PathBuf};

use plotters::coord::ranged1d::SegmentValue;
use plotters::coord::Shift;
use plotters::prelude::*;
use spend_core::formatting::format_compact_currency;
use spend_core::storage::write_atomic;
use spend_core::{Result, SpendError};
use spend_data::aggregator::AggregationResult;
use tracing::debug;

type DrawResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Suppliers drawn in the supplier chart.
const CHART_TOP_SUPPLIERS: usize = 10;
/// Longest axis label before truncation.
const LABEL_WIDTH: usize = 18;

/// Produces image artifacts from aggregation tables.
pub trait ChartRenderer {
    /// Render every figure into `dir` and return the written paths.
    fn render(&self, aggregation: &AggregationResult, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Renders SVG charts with `plotters`.
#[derive(Debug, Clone, Copy)]
pub struct SvgChartRenderer {
    size: (u32, u32),
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self { size: (1000, 600) }
    }
}

impl SvgChartRenderer {
    fn write(&self, dir: &Path, file_name: &str, svg: String) -> Result<PathBuf> {
        let path = dir.join(file_name);
        write_atomic(&path, svg.as_bytes()).map_err(|source| SpendError::FileWrite {
            path: path.clone(),
            source,
        })?;
        debug!("Chart written to {}", path.display());
        Ok(path)
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, aggregation: &AggregationResult, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        let yearly: Vec<(i32, f64)> = aggregation
            .yearly
            .iter()
            .filter_map(|p| p.key.parse().ok().map(|year| (year, p.sum)))
            .collect();
        if !yearly.is_empty() {
            let svg = draw(self.size, |root| {
                line_chart(root, "Yearly Spending Trends", "Year", &yearly)
            })?;
            written.push(self.write(dir, "yearly_spending.svg", svg)?);
        }

        let categories: Vec<(String, f64)> = aggregation
            .categories
            .iter()
            .map(|c| (c.key.clone(), c.sum))
            .collect();
        if !categories.is_empty() {
            let svg = draw(self.size, |root| {
                bar_chart(root, "Spending by Service Category", &categories)
            })?;
            written.push(self.write(dir, "category_breakdown.svg", svg)?);
        }

        let suppliers: Vec<(String, f64)> = aggregation
            .top_suppliers
            .iter()
            .take(CHART_TOP_SUPPLIERS)
            .map(|s| (s.key.clone(), s.sum))
            .collect();
        if !suppliers.is_empty() {
            let svg = draw(self.size, |root| {
                bar_chart(root, "Top 10 Suppliers by Spending", &suppliers)
            })?;
            written.push(self.write(dir, "top_suppliers.svg", svg)?);
        }

        let monthly: Vec<(i32, f64)> = aggregation
            .monthly
            .iter()
            .filter_map(|p| Some((p.key.parse().ok()?, p.mean?)))
            .collect();
        if !monthly.is_empty() {
            let svg = draw(self.size, |root| {
                line_chart(root, "Average Payment by Month", "Month", &monthly)
            })?;
            written.push(self.write(dir, "monthly_pattern.svg", svg)?);
        }

        Ok(written)
    }
}

// ── Drawing helpers ───────────────────────────────────────────────────────────

/// Run `paint` against an in-memory SVG canvas and return the document.
fn draw<F>(size: (u32, u32), paint: F) -> Result<String>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> DrawResult<()>,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        paint(&root)
            .and_then(|()| root.present().map_err(Into::into))
            .map_err(|e| SpendError::Visualization(e.to_string()))?;
    }
    Ok(svg)
}

/// Value axis covering zero and every value, with headroom.
fn value_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (low, high) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = (high - low).max(1.0);
    (low - if low < 0.0 { span * 0.1 } else { 0.0 })..(high + span * 0.1)
}

fn line_chart(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    title: &str,
    x_desc: &str,
    points: &[(i32, f64)],
) -> DrawResult<()> {
    root.fill(&WHITE)?;

    let x_min = points.iter().map(|p| p.0).min().unwrap_or(0);
    let x_max = points.iter().map(|p| p.0).max().unwrap_or(0);
    let x_range = if x_min == x_max {
        (x_min - 1)..(x_max + 1)
    } else {
        x_min..x_max
    };

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24))
        .margin(16)
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x_range, value_range(points.iter().map(|p| p.1)))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("Spending")
        .x_label_formatter(&|x| x.to_string())
        .y_label_formatter(&|y| format_compact_currency(*y))
        .draw()?;

    let color = RGBColor(31, 119, 180);
    chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
    )?;

    Ok(())
}

fn bar_chart(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    title: &str,
    bars: &[(String, f64)],
) -> DrawResult<()> {
    root.fill(&WHITE)?;

    let labels: Vec<String> = bars.iter().map(|(label, _)| truncate(label)).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24))
        .margin(16)
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .build_cartesian_2d(
            (0..bars.len()).into_segmented(),
            value_range(bars.iter().map(|b| b.1)),
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .y_label_formatter(&|y| format_compact_currency(*y))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(RGBColor(44, 160, 44).filled())
            .margin(8)
            .data(bars.iter().enumerate().map(|(i, (_, value))| (i, *value))),
    )?;

    Ok(())
}

fn truncate(label: &str) -> String {
    if label.chars().count() <= LABEL_WIDTH {
        label.to_string()
    } else {
        let head: String = label.chars().take(LABEL_WIDTH - 1).collect();
        format!("{head}…")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
