//! The analysis run over processed snapshots.
//!
//! Loads every `processed_*.csv` in the data directory, aggregates, runs
//! the anomaly detectors, renders figures, and writes the report and the
//! complete-analysis JSON. A chart failure is logged and recorded; it never
//! fails the run.

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use spend_core::models::PROCESSED_COLUMNS;
use spend_core::Result;
use spend_data::aggregator::{AggregationResult, Aggregator, DateRange};
use spend_data::anomalies::{AnomalyDetector, AnomalyReport};
use spend_data::categorizer::Categorizer;
use spend_data::reader::load_processed_data;
use spend_report::{ChartRenderer, ReportBuilder};

use crate::sink::ArtifactSink;

/// Shape of `complete_analysis_<ts>.json`.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteAnalysis<'a> {
    pub analysis: &'a AggregationResult,
    pub anomalies: &'a AnomalyReport,
    pub report: &'a str,
    pub data_summary: DataSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_records: usize,
    pub columns: Vec<String>,
    pub date_range: Option<DateRange>,
    /// Source type the aggregation was restricted to, if any.
    pub scope: Option<String>,
}

/// What an analysis run produced.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub report: String,
    pub aggregation: AggregationResult,
    pub anomalies: AnomalyReport,
    pub data_summary: DataSummary,
    pub report_file: PathBuf,
    pub analysis_file: PathBuf,
    pub figures: Vec<PathBuf>,
    /// Set when the chart renderer failed.
    pub chart_error: Option<String>,
}

pub struct Analyzer {
    data_dir: PathBuf,
    analysis_dir: PathBuf,
    source_type: Option<String>,
    renderer: Option<Box<dyn ChartRenderer>>,
}

impl Analyzer {
    pub fn new(data_dir: impl Into<PathBuf>, analysis_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            analysis_dir: analysis_dir.into(),
            source_type: None,
            renderer: None,
        }
    }

    /// Restrict aggregation and detection to one `source_type`.
    pub fn with_source_type(mut self, source_type: Option<String>) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn figures_dir(&self) -> PathBuf {
        self.analysis_dir.join("figures")
    }

    pub fn run(&self) -> Result<AnalysisOutcome> {
        self.run_at(Local::now().naive_local())
    }

    /// Run with an explicit clock, used for the report header and file names.
    pub fn run_at(&self, now: NaiveDateTime) -> Result<AnalysisOutcome> {
        tracing::info!("Starting spending analysis");

        let mut dataset = load_processed_data(&self.data_dir)?;
        Categorizer::categorize_dataset(&mut dataset);

        if let Some(source_type) = &self.source_type {
            dataset = dataset.scoped_to(source_type);
            if dataset.is_empty() {
                tracing::warn!(source_type = %source_type, "No records for source type");
            }
        }

        let aggregation = Aggregator::aggregate(&dataset);
        let anomalies = AnomalyDetector::detect(&dataset);

        let (figures, chart_error) = self.render_charts(&aggregation);

        let report = ReportBuilder::build(&aggregation, &anomalies, now);

        let data_summary = DataSummary {
            total_records: dataset.len(),
            columns: PROCESSED_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .chain(dataset.extra_columns.iter().cloned())
                .collect(),
            date_range: aggregation.summary.date_range,
            scope: self.source_type.clone(),
        };

        let sink = ArtifactSink::new(&self.analysis_dir, now);
        let report_file = sink.write_text("spending_report", &report)?;
        let analysis_file = sink.write_json(
            "complete_analysis",
            &CompleteAnalysis {
                analysis: &aggregation,
                anomalies: &anomalies,
                report: &report,
                data_summary: data_summary.clone(),
            },
        )?;

        tracing::info!(
            records = dataset.len(),
            figures = figures.len(),
            "Analysis complete"
        );

        Ok(AnalysisOutcome {
            report,
            aggregation,
            anomalies,
            data_summary,
            report_file,
            analysis_file,
            figures,
            chart_error,
        })
    }

    fn render_charts(&self, aggregation: &AggregationResult) -> (Vec<PathBuf>, Option<String>) {
        let Some(renderer) = &self.renderer else {
            return (Vec::new(), None);
        };
        let dir = self.figures_dir();
        match renderer.render(aggregation, &dir) {
            Ok(figures) => {
                tracing::info!("Visualizations saved to {}", dir.display());
                (figures, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Chart rendering failed; continuing without figures");
                (Vec::new(), Some(e.to_string()))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
