//! Shared building blocks for the spending pipeline.
//!
//! Canonical models, the error taxonomy, CLI settings, value parsers,
//! descriptive statistics, display formatting and atomic file writes.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;
pub mod storage;

pub use error::{FailureKind, FetchFailure, Result, SpendError};
