//! Data layer of the spending pipeline.
//!
//! Source catalogue, paced fetching of raw CSV payloads, schema
//! normalization, keyword categorization, aggregation, anomaly detection,
//! and loading of processed snapshots for the analyzer.

pub mod aggregator;
pub mod anomalies;
pub mod categorizer;
pub mod fetcher;
pub mod normalizer;
pub mod reader;
pub mod sources;

pub use spend_core as core;

#[cfg(test)]
mod tests {
    use spend_core::models::{Provenance, RawDataset};

    use crate::aggregator::Aggregator;
    use crate::anomalies::AnomalyDetector;
    use crate::categorizer::Categorizer;
    use crate::normalizer::normalize;

    fn cells(row: &[&str]) -> Vec<String> {
        row.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_three_row_pipeline() {
        let raw = RawDataset {
            headers: cells(&["Supplier", "Invoice Date", "Payment Date", "Invoice Amount", "Description"]),
            rows: vec![
                cells(&["Acme", "2023-01-01", "2023-01-10", "$1,000.00", "detention services"]),
                cells(&["Beta", "2023-02-01", "2023-05-10", "500", "community supervision"]),
                cells(&["Gamma", "2023-03-01", "2023-03-05", "2,000,000", "other"]),
            ],
            provenance: Provenance::new("on_time_payments", "2024-25"),
        };

        let mut dataset = normalize(&raw);
        assert_eq!(dataset.len(), raw.len());
        assert_eq!(dataset.amounts(), vec![1000.0, 500.0, 2_000_000.0]);

        Categorizer::categorize_dataset(&mut dataset);
        let labels: Vec<&str> = dataset
            .records
            .iter()
            .map(|r| r.category_label().as_str())
            .collect();
        assert_eq!(labels, vec!["detention_services", "community_services", "other"]);

        let aggregation = Aggregator::aggregate(&dataset);
        assert_eq!(aggregation.yearly[0].key, "2023");
        assert_eq!(aggregation.yearly[0].sum, 2_001_500.0);
        assert_eq!(aggregation.yearly[0].count, 3);

        let anomalies = AnomalyDetector::detect(&dataset);
        let delays = anomalies.payment_delays.unwrap();
        assert_eq!(delays.count, 1);
        assert_eq!(delays.examples[0].supplier_name, "Beta");
        assert!(delays.examples[0].delay_days.unwrap() > 90);
    }
}
