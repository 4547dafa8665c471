//! Outlier, large-payment and payment-delay detection.
//!
//! The three detectors are independent. A detector whose inputs are absent
//! from the whole dataset yields `None` instead of failing the pass.

use serde::{Deserialize, Serialize};
use spend_core::formatting::percentage;
use spend_core::models::{NormalizedDataset, PaymentRecord};
use spend_core::stats::{self, IqrBounds};

/// Percentile above which a payment counts as large.
pub const LARGE_PAYMENT_PERCENTILE: f64 = 99.0;
/// Delays strictly above this many days are flagged.
pub const LONG_DELAY_DAYS: i64 = 90;
/// Illustrative examples kept per detector.
pub const EXAMPLE_LIMIT: usize = 5;

// ── Report types ──────────────────────────────────────────────────────────────

/// One flagged record, with enough context to read it in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyExample {
    /// Position of the record in the dataset.
    pub index: usize,
    pub supplier_name: String,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub delay_days: Option<i64>,
}

impl AnomalyExample {
    fn from_record(index: usize, record: &PaymentRecord) -> Self {
        Self {
            index,
            supplier_name: record.supplier_key().to_string(),
            amount: record.amount,
            description: record.description.clone(),
            delay_days: record.payment_delay_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: usize,
    /// Share of all records, in percent to 2 places.
    pub percentage: f64,
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LargePaymentReport {
    pub threshold: f64,
    pub count: usize,
    pub total_value: f64,
    /// Largest first; equal amounts keep input order.
    pub examples: Vec<AnomalyExample>,
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayReport {
    pub threshold_days: i64,
    /// Records with both dates.
    pub measured: usize,
    pub count: usize,
    pub mean_delay: f64,
    pub max_delay: i64,
    /// Longest first; equal delays keep input order.
    pub examples: Vec<AnomalyExample>,
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub statistical_outliers: Option<OutlierReport>,
    pub large_payments: Option<LargePaymentReport>,
    pub payment_delays: Option<DelayReport>,
}

// ── AnomalyDetector ───────────────────────────────────────────────────────────

/// Stateless helper running the three detectors.
pub struct AnomalyDetector;

impl AnomalyDetector {
    pub fn detect(dataset: &NormalizedDataset) -> AnomalyReport {
        AnomalyReport {
            statistical_outliers: Self::statistical_outliers(dataset),
            large_payments: Self::large_payments(dataset),
            payment_delays: Self::payment_delays(dataset),
        }
    }

    /// IQR fences over every defined amount.
    pub fn statistical_outliers(dataset: &NormalizedDataset) -> Option<OutlierReport> {
        let bounds = IqrBounds::from_values(&dataset.amounts())?;

        let indices: Vec<usize> = amounts_with_index(dataset)
            .filter(|(_, amount)| !bounds.contains(*amount))
            .map(|(i, _)| i)
            .collect();

        Some(OutlierReport {
            q1: bounds.q1,
            q3: bounds.q3,
            iqr: bounds.iqr,
            lower_bound: bounds.lower,
            upper_bound: bounds.upper,
            count: indices.len(),
            percentage: percentage(indices.len() as f64, dataset.len() as f64, 2),
            indices,
        })
    }

    /// Payments strictly above the 99th percentile.
    pub fn large_payments(dataset: &NormalizedDataset) -> Option<LargePaymentReport> {
        let sorted = stats::sorted(&dataset.amounts());
        let threshold = stats::percentile(&sorted, LARGE_PAYMENT_PERCENTILE)?;

        let mut flagged: Vec<(usize, f64)> = amounts_with_index(dataset)
            .filter(|(_, amount)| *amount > threshold)
            .collect();
        let indices: Vec<usize> = flagged.iter().map(|(i, _)| *i).collect();
        let total_value: f64 = flagged.iter().map(|(_, a)| a).sum();

        flagged.sort_by(|a, b| b.1.total_cmp(&a.1));
        let examples = flagged
            .iter()
            .take(EXAMPLE_LIMIT)
            .map(|(i, _)| AnomalyExample::from_record(*i, &dataset.records[*i]))
            .collect();

        Some(LargePaymentReport {
            threshold,
            count: indices.len(),
            total_value,
            examples,
            indices,
        })
    }

    /// Invoice-to-payment delays; negative delays are reported as they are.
    pub fn payment_delays(dataset: &NormalizedDataset) -> Option<DelayReport> {
        let delays: Vec<(usize, i64)> = dataset
            .records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.payment_delay_days().map(|d| (i, d)))
            .collect();
        let max_delay = delays.iter().map(|(_, d)| *d).max()?;

        let total: i64 = delays.iter().map(|(_, d)| d).sum();
        let mean_delay = total as f64 / delays.len() as f64;

        let mut flagged: Vec<(usize, i64)> = delays
            .iter()
            .copied()
            .filter(|(_, d)| *d > LONG_DELAY_DAYS)
            .collect();
        let indices: Vec<usize> = flagged.iter().map(|(i, _)| *i).collect();

        flagged.sort_by(|a, b| b.1.cmp(&a.1));
        let examples = flagged
            .iter()
            .take(EXAMPLE_LIMIT)
            .map(|(i, _)| AnomalyExample::from_record(*i, &dataset.records[*i]))
            .collect();

        Some(DelayReport {
            threshold_days: LONG_DELAY_DAYS,
            measured: delays.len(),
            count: indices.len(),
            mean_delay,
            max_delay,
            examples,
            indices,
        })
    }
}

fn amounts_with_index(dataset: &NormalizedDataset) -> impl Iterator<Item = (usize, f64)> + '_ {
    dataset
        .records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.amount.map(|a| (i, a)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
