//! The collection run: fetch every catalogued source, normalize,
//! categorize, snapshot, and summarize.
//!
//! Fetch failures are isolated per (source, period). Normalization starts
//! only once every fetch of the run has resolved.

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use spend_core::models::{NormalizedDataset, RawDataset};
use spend_core::{FetchFailure, Result};
use spend_data::aggregator::{AggregationResult, Aggregator, BasicStats, GroupStats, PeriodStats};
use spend_data::categorizer::Categorizer;
use spend_data::fetcher::{Fetcher, Transport};
use spend_data::normalizer::Normalizer;
use spend_data::sources::SourceRegistry;

use crate::sink::ArtifactSink;

/// Name given to the concatenation of every dataset in a run.
pub const COMBINED_DATASET: &str = "combined";

// ── Outcome types ─────────────────────────────────────────────────────────────

/// One dataset that made it through the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub source_id: String,
    pub period: String,
    pub rows: usize,
    pub processed_file: PathBuf,
}

/// Shape of `spending_analysis_<ts>.json`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub generated_at: String,
    pub summary: BasicStats,
    pub trends: Trends,
    pub categories: Vec<GroupStats>,
    pub suppliers: Vec<GroupStats>,
    pub datasets: Vec<DatasetSummary>,
    pub failures: Vec<FetchFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trends {
    /// Keyed by financial-year label.
    pub yearly: Vec<PeriodStats>,
    /// Keyed by calendar year of invoice date.
    pub calendar_years: Vec<PeriodStats>,
}

/// What a collection run produced.
#[derive(Debug)]
pub struct CollectionOutcome {
    pub datasets: Vec<DatasetSummary>,
    pub failures: Vec<FetchFailure>,
    /// `<source>_<period>` pairs that were reachable but had no rows.
    pub empty: Vec<String>,
    pub combined: NormalizedDataset,
    pub aggregation: Option<AggregationResult>,
    pub summary_file: Option<PathBuf>,
}

// ── Collector ─────────────────────────────────────────────────────────────────

pub struct Collector<T: Transport> {
    registry: SourceRegistry,
    fetcher: Fetcher<T>,
    data_dir: PathBuf,
}

impl<T: Transport> Collector<T> {
    pub fn new(registry: SourceRegistry, fetcher: Fetcher<T>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            fetcher,
            data_dir: data_dir.into(),
        }
    }

    pub fn run(&mut self) -> Result<CollectionOutcome> {
        self.run_at(Local::now().naive_local())
    }

    /// Run with an explicit clock, used for artifact names.
    pub fn run_at(&mut self, now: NaiveDateTime) -> Result<CollectionOutcome> {
        tracing::info!("Starting data collection");
        let sink = ArtifactSink::new(&self.data_dir, now);

        let (raws, failures, empty) = self.fetch_all();

        let normalizer = Normalizer::new();
        let mut datasets = Vec::with_capacity(raws.len());
        let mut normalized = Vec::with_capacity(raws.len());
        for raw in &raws {
            let mut dataset = normalizer.normalize(raw);
            Categorizer::recategorize_dataset(&mut dataset);
            let processed_file = sink.write_processed(&dataset)?;
            datasets.push(DatasetSummary {
                name: dataset.name.clone(),
                source_id: raw.provenance.source_id.clone(),
                period: raw.provenance.period.clone(),
                rows: dataset.len(),
                processed_file,
            });
            normalized.push(dataset);
        }

        let combined = NormalizedDataset::combine(COMBINED_DATASET, normalized);
        if combined.is_empty() {
            tracing::error!(
                failures = failures.len(),
                "No data collected; nothing to summarize"
            );
            return Ok(CollectionOutcome {
                datasets,
                failures,
                empty,
                combined,
                aggregation: None,
                summary_file: None,
            });
        }

        let aggregation = Aggregator::aggregate(&combined);
        let summary = CollectionSummary {
            generated_at: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            summary: aggregation.summary.clone(),
            trends: Trends {
                yearly: aggregation.financial_years.clone(),
                calendar_years: aggregation.yearly.clone(),
            },
            categories: aggregation.categories.clone(),
            suppliers: aggregation.top_suppliers.clone(),
            datasets: datasets.clone(),
            failures: failures.clone(),
        };
        let summary_file = sink.write_json("spending_analysis", &summary)?;

        tracing::info!(
            records = combined.len(),
            datasets = datasets.len(),
            failures = failures.len(),
            "Data collection complete"
        );

        Ok(CollectionOutcome {
            datasets,
            failures,
            empty,
            combined,
            aggregation: Some(aggregation),
            summary_file: Some(summary_file),
        })
    }

    /// Fetch every tabular (source, period) pair in catalogue order.
    fn fetch_all(&mut self) -> (Vec<RawDataset>, Vec<FetchFailure>, Vec<String>) {
        let mut raws = Vec::new();
        let mut failures = Vec::new();
        let mut empty = Vec::new();

        for source in self.registry.list_sources() {
            if !source.is_tabular() {
                tracing::debug!(source_id = %source.id, "Skipping non-tabular source");
                continue;
            }
            tracing::info!(source_id = %source.id, "Collecting {}", source.description);

            for period in &source.periods {
                match self.fetcher.fetch(&source.id, &period.label, &period.location) {
                    Ok(raw) if raw.is_empty() => {
                        tracing::warn!(
                            source_id = %source.id,
                            period = %period.label,
                            "Dataset has no rows; skipping"
                        );
                        empty.push(raw.name());
                    }
                    Ok(raw) => raws.push(raw),
                    Err(failure) => {
                        tracing::error!("{}", failure);
                        failures.push(failure);
                    }
                }
            }
        }

        (raws, failures, empty)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use spend_core::models::{DataSource, SourceFormat, SourcePeriod};
    use spend_core::models::ServiceCategory;
    use spend_core::FailureKind;
    use spend_data::reader::load_processed_data;
    use spend_data::fetcher::TransportError;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    struct StubTransport(HashMap<String, String>);

    impl Transport for StubTransport {
        fn get(&self, location: &str) -> std::result::Result<Vec<u8>, TransportError> {
            self.0
                .get(location)
                .map(|body| body.as_bytes().to_vec())
                .ok_or_else(|| TransportError::new(FailureKind::HttpStatus, "404 Not Found"))
        }
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn source(id: &str, format: SourceFormat, periods: &[(&str, &str)]) -> DataSource {
        DataSource {
            id: id.to_string(),
            description: format!("{id} data"),
            format,
            periods: periods
                .iter()
                .map(|(label, location)| SourcePeriod {
                    label: label.to_string(),
                    location: location.to_string(),
                })
                .collect(),
        }
    }

    const PAYMENTS: &str = "Supplier,Invoice Date,Payment Date,Invoice Amount,Description\n\
Acme,2023-01-01,2023-01-10,\"$1,000.00\",detention services\n\
Beta,2023-02-01,2023-05-10,500,community supervision\n\
Gamma,2023-03-01,2023-03-05,\"2,000,000\",other\n";

    const CONSULTANCIES: &str = "Consultant,Total Cost,Purpose\nLegal Aid Qld,1500,representation\n";

    fn collector(tmp: &TempDir) -> Collector<StubTransport> {
        let registry = SourceRegistry::new(vec![
            source("payments", SourceFormat::Csv, &[("2022-23", "https://a.example/p.csv")]),
            source(
                "consultancies",
                SourceFormat::Csv,
                &[
                    ("2021-22", "https://b.example/c.csv"),
                    ("2020-21", "https://b.example/missing.csv"),
                    ("2019-20", "https://b.example/empty.csv"),
                ],
            ),
            source("reports", SourceFormat::Pdf, &[("2023-24", "https://c.example/r.pdf")]),
        ]);
        let transport = StubTransport(HashMap::from([
            ("https://a.example/p.csv".to_string(), PAYMENTS.to_string()),
            ("https://b.example/c.csv".to_string(), CONSULTANCIES.to_string()),
            (
                "https://b.example/empty.csv".to_string(),
                "Consultant,Total Cost\n".to_string(),
            ),
        ]));
        let fetcher = Fetcher::new(transport, tmp.path(), Duration::ZERO);
        Collector::new(registry, fetcher, tmp.path())
    }

    #[test]
    fn test_failure_is_isolated() {
        let tmp = TempDir::new().unwrap();
        let outcome = collector(&tmp).run_at(at()).unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source_id, "consultancies");
        assert_eq!(outcome.failures[0].period, "2020-21");
        assert_eq!(outcome.datasets.len(), 2);
        assert_eq!(outcome.empty, vec!["consultancies_2019-20"]);
        assert_eq!(outcome.combined.len(), 4);
    }

    #[test]
    fn test_artifacts_written() {
        let tmp = TempDir::new().unwrap();
        let outcome = collector(&tmp).run_at(at()).unwrap();

        assert!(tmp.path().join("payments_2022-23.csv").exists());
        assert!(tmp.path().join("consultancies_2021-22.csv").exists());
        assert!(!tmp.path().join("reports_2023-24.csv").exists());
        assert!(tmp
            .path()
            .join("processed_payments_2022-23_20240701_120000.csv")
            .exists());
        assert!(tmp
            .path()
            .join("processed_consultancies_2021-22_20240701_120000.csv")
            .exists());

        let summary_file = outcome.summary_file.unwrap();
        assert_eq!(
            summary_file.file_name().unwrap().to_string_lossy(),
            "spending_analysis_20240701_120000.json"
        );
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(summary_file).unwrap()).unwrap();
        assert_eq!(json["summary"]["total_records"], 4);
        assert_eq!(json["failures"][0]["kind"], "http_status");
        assert_eq!(json["datasets"][0]["rows"], 3);
    }

    #[test]
    fn test_records_categorized_and_tagged() {
        let tmp = TempDir::new().unwrap();
        let outcome = collector(&tmp).run_at(at()).unwrap();

        let labels: Vec<&str> = outcome
            .combined
            .records
            .iter()
            .map(|r| r.category_label().as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["detention_services", "community_services", "other", "legal_services"]
        );
        assert_eq!(outcome.combined.records[3].source_type, "consultancies");
        assert_eq!(outcome.combined.records[3].amount, Some(1500.0));

        let aggregation = outcome.aggregation.unwrap();
        assert_eq!(aggregation.summary.total_amount, 2_003_000.0);
    }

    #[test]
    fn test_slash_period_reaches_the_analyzer() {
        let tmp = TempDir::new().unwrap();
        let registry = SourceRegistry::new(vec![source(
            "payments",
            SourceFormat::Csv,
            &[("2024/25", "https://a.example/p.csv")],
        )]);
        let transport = StubTransport(HashMap::from([(
            "https://a.example/p.csv".to_string(),
            PAYMENTS.to_string(),
        )]));
        let fetcher = Fetcher::new(transport, tmp.path(), Duration::ZERO);
        let outcome = Collector::new(registry, fetcher, tmp.path())
            .run_at(at())
            .unwrap();

        assert_eq!(
            outcome.datasets[0].processed_file,
            tmp.path().join("processed_payments_2024-25_20240701_120000.csv")
        );
        assert!(tmp.path().join("payments_2024-25.csv").is_file());

        let reloaded = load_processed_data(tmp.path()).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.records[0].financial_year, "2024/25");
        assert_eq!(reloaded.records[0].dataset, "payments_2024/25");
    }

    #[test]
    fn test_source_supplied_category_is_recomputed() {
        let tmp = TempDir::new().unwrap();
        let registry = SourceRegistry::new(vec![source(
            "labelled",
            SourceFormat::Csv,
            &[("2024-25", "https://a.example/l.csv")],
        )]);
        let transport = StubTransport(HashMap::from([(
            "https://a.example/l.csv".to_string(),
            "Supplier,Description,service_category\nAcme,detention services,legal_services\n"
                .to_string(),
        )]));
        let fetcher = Fetcher::new(transport, tmp.path(), Duration::ZERO);
        let outcome = Collector::new(registry, fetcher, tmp.path())
            .run_at(at())
            .unwrap();

        assert_eq!(
            outcome.combined.records[0].service_category,
            Some(ServiceCategory::DetentionServices)
        );
    }

    #[test]
    fn test_nothing_collected() {
        let tmp = TempDir::new().unwrap();
        let registry = SourceRegistry::new(vec![source(
            "gone",
            SourceFormat::Csv,
            &[("2024-25", "https://a.example/gone.csv")],
        )]);
        let fetcher = Fetcher::new(StubTransport(HashMap::new()), tmp.path(), Duration::ZERO);
        let outcome = Collector::new(registry, fetcher, tmp.path())
            .run_at(at())
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.summary_file.is_none());
        assert!(outcome.aggregation.is_none());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
