use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single source/period could not be collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection, DNS or TLS failure.
    Network,
    /// The request exceeded the configured timeout.
    Timeout,
    /// The origin answered with a non-2xx status.
    HttpStatus,
    /// The body could not be parsed as delimited tabular text.
    Parse,
    /// The raw bytes could not be persisted locally.
    Storage,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::Network => "network error",
            FailureKind::Timeout => "timed out",
            FailureKind::HttpStatus => "bad status",
            FailureKind::Parse => "parse error",
            FailureKind::Storage => "storage error",
        };
        f.write_str(label)
    }
}

/// A collection failure isolated to one (source, period) pair.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("Failed to collect {source_id} ({period}): {kind}: {cause}")]
pub struct FetchFailure {
    pub source_id: String,
    pub period: String,
    pub kind: FailureKind,
    pub cause: String,
}

impl FetchFailure {
    pub fn new(
        source_id: impl Into<String>,
        period: impl Into<String>,
        kind: FailureKind,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            period: period.into(),
            kind,
            cause: cause.into(),
        }
    }
}

/// All errors produced by the spending pipeline.
#[derive(Error, Debug)]
pub enum SpendError {
    /// A source could not be fetched or parsed.
    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    /// A CSV document could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A dataset on disk was structurally unusable.
    #[error("Failed to parse dataset {dataset}: {reason}")]
    DatasetParse { dataset: String, reason: String },

    /// The analyzer was started before any processed data existed.
    #[error("No processed data files found in {0}; run the collector first")]
    MissingPrerequisite(PathBuf),

    /// The chart collaborator failed.
    #[error("Visualization failed: {0}")]
    Visualization(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpendError {
    /// `true` for the one error that tells the caller to collect first.
    pub fn is_missing_prerequisite(&self) -> bool {
        matches!(self, SpendError::MissingPrerequisite(_))
    }
}

/// Convenience alias used throughout the spend crates.
pub type Result<T> = std::result::Result<T, SpendError>;
