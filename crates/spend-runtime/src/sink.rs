//! Durable artifacts: structured summaries, processed snapshots, reports.
//!
//! Every artifact name embeds the run timestamp so successive runs never
//! overwrite each other, and every write goes through a temp file.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use spend_core::models::{NormalizedDataset, PaymentRecord, PROCESSED_COLUMNS};
use spend_core::storage::{file_component, write_atomic};
use spend_core::{Result, SpendError};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Writes one run's artifacts into a directory.
#[derive(Debug, Clone)]
pub struct ArtifactSink {
    dir: PathBuf,
    timestamp: String,
}

impl ArtifactSink {
    pub fn new(dir: impl Into<PathBuf>, generated_at: NaiveDateTime) -> Self {
        Self {
            dir: dir.into(),
            timestamp: generated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// `<dir>/<stem>_<timestamp>.<ext>`
    pub fn artifact_path(&self, stem: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{stem}_{}.{ext}", self.timestamp))
    }

    /// Pretty-printed JSON artifact.
    pub fn write_json<T: Serialize>(&self, stem: &str, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)?;
        self.write(self.artifact_path(stem, "json"), json.as_bytes())
    }

    /// Plain-text artifact.
    pub fn write_text(&self, stem: &str, text: &str) -> Result<PathBuf> {
        self.write(self.artifact_path(stem, "txt"), text.as_bytes())
    }

    /// `processed_<dataset>_<timestamp>.csv` in the canonical column order,
    /// followed by the dataset's uninterpreted columns. The dataset name is
    /// flattened so the file always lands directly in the sink directory.
    pub fn write_processed(&self, dataset: &NormalizedDataset) -> Result<PathBuf> {
        let bytes = processed_csv(dataset)?;
        self.write(
            self.artifact_path(&format!("processed_{}", file_component(&dataset.name)), "csv"),
            &bytes,
        )
    }

    fn write(&self, path: PathBuf, contents: &[u8]) -> Result<PathBuf> {
        write_atomic(&path, contents).map_err(|source| SpendError::FileWrite {
            path: path.clone(),
            source,
        })?;
        tracing::info!("Saved {}", path.display());
        Ok(path)
    }
}

/// Serialize a dataset as processed-snapshot CSV.
pub fn processed_csv(dataset: &NormalizedDataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = PROCESSED_COLUMNS
        .iter()
        .copied()
        .chain(dataset.extra_columns.iter().map(String::as_str));
    writer.write_record(header)?;

    for record in &dataset.records {
        let mut row = canonical_cells(record);
        row.extend(
            dataset
                .extra_columns
                .iter()
                .map(|column| record.extra(column).unwrap_or_default().to_string()),
        );
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| SpendError::Io(e.into_error()))
}

/// Cells in [`PROCESSED_COLUMNS`] order.
fn canonical_cells(record: &PaymentRecord) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let date = |value: Option<chrono::NaiveDate>| {
        value
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };

    vec![
        text(&record.supplier_name),
        date(record.invoice_date),
        date(record.payment_date),
        record.amount.map(|a| a.to_string()).unwrap_or_default(),
        text(&record.description),
        record.category_label().as_str().to_string(),
        record.source_type.clone(),
        record.financial_year.clone(),
        text(&record.category),
        text(&record.collection_date),
        record.dataset.clone(),
    ]
}

// ── Tests ─────────────────────────────────────────────────────────────────────
