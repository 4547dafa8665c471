//! Retrieval of raw tabular datasets.
//!
//! One [`Fetcher::fetch`] call downloads a single (source, period) pair,
//! keeps the bytes on disk under `<source_id>_<period>.csv` and parses them
//! into a [`RawDataset`]. Every failure is returned as a [`FetchFailure`] so
//! the caller can carry on with the remaining sources.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use spend_core::models::{Provenance, RawDataset};
use spend_core::storage::{file_component, write_atomic};
use spend_core::{FailureKind, FetchFailure, Result, SpendError};
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = concat!(
    "spend-monitor/",
    env!("CARGO_PKG_VERSION"),
    " (public spending research)"
);

// ── Transport ─────────────────────────────────────────────────────────────────

/// A failed retrieval, before it is attributed to a source.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {cause}")]
pub struct TransportError {
    pub kind: FailureKind,
    pub cause: String,
}

impl TransportError {
    pub fn new(kind: FailureKind, cause: impl Into<String>) -> Self {
        Self {
            kind,
            cause: cause.into(),
        }
    }
}

/// Byte retrieval for one location.
pub trait Transport {
    fn get(&self, location: &str) -> std::result::Result<Vec<u8>, TransportError>;
}

/// Blocking HTTP transport with a fixed per-request timeout.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SpendError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, location: &str) -> std::result::Result<Vec<u8>, TransportError> {
        let resp = self.client.get(location).send().map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::new(FailureKind::HttpStatus, status.to_string()));
        }

        let body = resp.bytes().map_err(classify)?;
        Ok(body.to_vec())
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_status() {
        FailureKind::HttpStatus
    } else {
        FailureKind::Network
    };
    TransportError::new(kind, err.to_string())
}

// ── Pacer ─────────────────────────────────────────────────────────────────────

/// Enforces a minimum gap between consecutive requests to the same host.
#[derive(Debug)]
pub struct Pacer {
    min_delay: Duration,
    last_request: HashMap<String, Instant>,
}

impl Pacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: HashMap::new(),
        }
    }

    /// Block until `host` may be contacted again, then record the request.
    pub fn wait(&mut self, host: &str) {
        if let Some(last) = self.last_request.get(host) {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let remaining = self.min_delay - elapsed;
                debug!(host, wait_ms = remaining.as_millis() as u64, "Pacing request");
                std::thread::sleep(remaining);
            }
        }
        self.last_request.insert(host.to_string(), Instant::now());
    }
}

/// Host part of a URL; the whole location when it does not parse.
pub fn host_key(location: &str) -> String {
    reqwest::Url::parse(location)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| location.to_string())
}

// ── Fetcher ───────────────────────────────────────────────────────────────────

/// Sequential, paced downloader that persists raw payloads.
pub struct Fetcher<T: Transport> {
    transport: T,
    pacer: Pacer,
    raw_dir: PathBuf,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, raw_dir: impl Into<PathBuf>, min_delay: Duration) -> Self {
        Self {
            transport,
            pacer: Pacer::new(min_delay),
            raw_dir: raw_dir.into(),
        }
    }

    /// Where the raw bytes of `(source_id, period)` are kept. Both parts are
    /// flattened into one file name directly under the raw directory.
    pub fn raw_path(&self, source_id: &str, period: &str) -> PathBuf {
        self.raw_dir.join(format!(
            "{}_{}.csv",
            file_component(source_id),
            file_component(period)
        ))
    }

    /// Download, persist and parse one (source, period) pair.
    pub fn fetch(
        &mut self,
        source_id: &str,
        period: &str,
        location: &str,
    ) -> std::result::Result<RawDataset, FetchFailure> {
        let fail = |kind: FailureKind, cause: String| FetchFailure::new(source_id, period, kind, cause);

        self.pacer.wait(&host_key(location));
        info!(source_id, period, "Fetching {}", location);

        let bytes = self
            .transport
            .get(location)
            .map_err(|e| fail(e.kind, e.cause))?;

        let path = self.raw_path(source_id, period);
        write_atomic(&path, &bytes)
            .map_err(|e| fail(FailureKind::Storage, format!("{}: {e}", path.display())))?;
        debug!(source_id, period, bytes = bytes.len(), "Saved raw data to {}", path.display());

        let (headers, rows) =
            parse_csv_bytes(&bytes).map_err(|e| fail(FailureKind::Parse, e.to_string()))?;

        info!(source_id, period, rows = rows.len(), "Parsed dataset");
        Ok(RawDataset {
            headers,
            rows,
            provenance: Provenance::new(source_id, period),
        })
    }
}

// ── CSV parsing ───────────────────────────────────────────────────────────────

/// Parse delimited text into a header row and data rows.
///
/// Cells are trimmed, a leading UTF-8 BOM is dropped, invalid UTF-8 is
/// replaced, and every row is padded or truncated to the header width.
pub fn parse_csv_bytes(bytes: &[u8]) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|cell| String::from_utf8_lossy(cell).trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(SpendError::DatasetParse {
            dataset: "<raw>".to_string(),
            reason: "no header row".to_string(),
        });
    }

    let width = headers.len();
    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let mut row: Vec<String> = record
            .iter()
            .take(width)
            .map(|cell| String::from_utf8_lossy(cell).into_owned())
            .collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok((headers, rows))
}

/// Parse a CSV file already on disk.
pub fn parse_csv_file(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let bytes = std::fs::read(path).map_err(|source| SpendError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv_bytes(&bytes).map_err(|e| match e {
        SpendError::DatasetParse { reason, .. } => SpendError::DatasetParse {
            dataset: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
