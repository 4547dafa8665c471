//! Presentation layer: the plain-text analysis report and chart rendering.

pub mod charts;
pub mod report;

pub use charts::{ChartRenderer, SvgChartRenderer};
pub use report::ReportBuilder;
