//! Runtime orchestration for the spending pipeline.
//!
//! Drives the collection and analysis runs and owns the artifact sink that
//! both of them write through.

pub mod analyzer;
pub mod collector;
pub mod sink;

pub use spend_core as core;
pub use spend_data as data;
pub use spend_report as report;
