//! Discovery and loading of processed snapshots.
//!
//! The analyzer works from the `processed_*.csv` files the collector leaves
//! in the data directory rather than from the network.

use std::path::{Path, PathBuf};

use spend_core::models::NormalizedDataset;
use spend_core::{Result, SpendError};
use tracing::{debug, info, warn};

use crate::fetcher::parse_csv_file;
use crate::normalizer::{Normalizer, RecordDefaults};

const PROCESSED_PREFIX: &str = "processed_";

/// `processed_*.csv` directly inside `data_dir`, sorted by path.
pub fn find_processed_files(data_dir: &Path) -> Vec<PathBuf> {
    if !data_dir.exists() {
        warn!("Data directory does not exist: {}", data_dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| name.starts_with(PROCESSED_PREFIX) && name.ends_with(".csv"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load one processed snapshot.
pub fn load_processed_file(path: &Path, normalizer: &Normalizer) -> Result<NormalizedDataset> {
    let (headers, rows) = parse_csv_file(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let defaults = RecordDefaults {
        dataset: name.clone(),
        ..Default::default()
    };
    Ok(normalizer.normalize_rows(name, &headers, &rows, &defaults))
}

/// Load and concatenate every processed snapshot in `data_dir`.
///
/// Fails with [`SpendError::MissingPrerequisite`] when there is nothing to
/// load. Unreadable files are skipped with a warning as long as one loads.
pub fn load_processed_data(data_dir: &Path) -> Result<NormalizedDataset> {
    let files = find_processed_files(data_dir);
    if files.is_empty() {
        return Err(SpendError::MissingPrerequisite(data_dir.to_path_buf()));
    }

    let normalizer = Normalizer::new();
    let mut datasets = Vec::with_capacity(files.len());
    let mut last_error = None;

    for path in &files {
        match load_processed_file(path, &normalizer) {
            Ok(dataset) => {
                debug!(rows = dataset.len(), "Loaded {}", path.display());
                datasets.push(dataset);
            }
            Err(e) => {
                warn!("Skipping unreadable processed file {}: {}", path.display(), e);
                last_error = Some(e);
            }
        }
    }

    if datasets.is_empty() {
        return Err(last_error.unwrap_or_else(|| SpendError::MissingPrerequisite(data_dir.to_path_buf())));
    }

    let combined = NormalizedDataset::combine("combined", datasets);
    info!(
        records = combined.len(),
        files = files.len(),
        "Loaded processed data"
    );
    Ok(combined)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
