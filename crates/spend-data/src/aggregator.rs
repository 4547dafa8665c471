//! Grouped descriptive statistics over time, category and supplier.
//!
//! Records without an amount still count towards their group's record total
//! but are left out of every numeric aggregate. Records without an invoice
//! date are left out of the temporal groups only.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use spend_core::formatting::checked_percentage;
use spend_core::models::NormalizedDataset;
use spend_core::stats;

/// Suppliers kept in [`AggregationResult::top_suppliers`].
pub const TOP_SUPPLIER_LIMIT: usize = 20;
/// Suppliers counted towards the concentration metric.
pub const CONCENTRATION_TOP_N: usize = 10;

// ── Result types ──────────────────────────────────────────────────────────────

/// First and last invoice date seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Dataset-wide totals for the executive summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_records: usize,
    pub records_with_amount: usize,
    pub total_amount: f64,
    pub average_payment: Option<f64>,
    pub date_range: Option<DateRange>,
}

/// Sum/count/mean for one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    /// `"2023"`, `"2023-Q1"`, `"01"` or a financial-year label.
    pub key: String,
    pub sum: f64,
    pub count: usize,
    pub mean: Option<f64>,
}

/// Full statistics for one category, supplier or source type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub key: String,
    /// Records in the group, with or without an amount.
    pub records: usize,
    /// Records contributing an amount.
    pub count: usize,
    pub sum: f64,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
}

impl GroupStats {
    fn from_amounts(key: String, records: usize, amounts: &[f64]) -> Self {
        Self {
            key,
            records,
            count: amounts.len(),
            sum: amounts.iter().sum(),
            mean: stats::mean(amounts),
            median: stats::median(amounts),
            std_dev: stats::sample_std_dev(amounts),
        }
    }
}

/// How much of the spend the largest suppliers hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierConcentration {
    /// Share of total spend held by the top ten, in percent to 2 places;
    /// absent when the total is zero.
    pub top_10_percentage: Option<f64>,
    pub total_suppliers: usize,
    pub total_spending: f64,
}

/// Everything the aggregator derives from one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub summary: BasicStats,
    /// Ascending by calendar year of invoice date.
    pub yearly: Vec<PeriodStats>,
    /// Ascending, keyed `YYYY-Qn`.
    pub quarterly: Vec<PeriodStats>,
    /// Calendar month `01`..`12`; `mean` is the monthly pattern.
    pub monthly: Vec<PeriodStats>,
    /// Ascending by financial-year label.
    pub financial_years: Vec<PeriodStats>,
    /// Descending by sum; ties keep first-seen order.
    pub categories: Vec<GroupStats>,
    /// Top suppliers by sum; ties keep first-seen order.
    pub top_suppliers: Vec<GroupStats>,
    pub concentration: SupplierConcentration,
    /// First-seen order.
    pub source_types: Vec<GroupStats>,
}

// ── Grouping helpers ──────────────────────────────────────────────────────────

/// Insertion-ordered grouping of (record count, amounts) by key.
#[derive(Default)]
struct OrderedGroups {
    index: HashMap<String, usize>,
    groups: Vec<(String, usize, Vec<f64>)>,
}

impl OrderedGroups {
    fn add(&mut self, key: &str, amount: Option<f64>) {
        let slot = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.index.insert(key.to_string(), self.groups.len());
                self.groups.push((key.to_string(), 0, Vec::new()));
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[slot];
        group.1 += 1;
        group.2.extend(amount);
    }

    fn into_stats(self) -> Vec<GroupStats> {
        self.groups
            .into_iter()
            .map(|(key, records, amounts)| GroupStats::from_amounts(key, records, &amounts))
            .collect()
    }
}

/// Sorted-key accumulation of amounts per time bucket.
#[derive(Default)]
struct PeriodBuckets(BTreeMap<String, Vec<f64>>);

impl PeriodBuckets {
    fn add(&mut self, key: String, amount: Option<f64>) {
        self.0.entry(key).or_default().extend(amount);
    }

    fn into_stats(self) -> Vec<PeriodStats> {
        self.0
            .into_iter()
            .map(|(key, amounts)| PeriodStats {
                key,
                sum: amounts.iter().sum(),
                count: amounts.len(),
                mean: stats::mean(&amounts),
            })
            .collect()
    }
}

/// Stable descending sort by sum.
fn rank_by_sum(groups: &mut [GroupStats]) {
    groups.sort_by(|a, b| b.sum.total_cmp(&a.sum));
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless helper computing an [`AggregationResult`].
pub struct Aggregator;

impl Aggregator {
    pub fn aggregate(dataset: &NormalizedDataset) -> AggregationResult {
        let summary = Self::basic_stats(dataset);

        let mut yearly = PeriodBuckets::default();
        let mut quarterly = PeriodBuckets::default();
        let mut monthly = PeriodBuckets::default();
        let mut financial_years = PeriodBuckets::default();
        let mut categories = OrderedGroups::default();
        let mut suppliers = OrderedGroups::default();
        let mut source_types = OrderedGroups::default();

        for record in &dataset.records {
            if let Some(date) = record.invoice_date {
                yearly.add(date.year().to_string(), record.amount);
                quarterly.add(quarter_key(date), record.amount);
                monthly.add(format!("{:02}", date.month()), record.amount);
            }
            if !record.financial_year.is_empty() {
                financial_years.add(record.financial_year.clone(), record.amount);
            }
            categories.add(record.category_label().as_str(), record.amount);
            suppliers.add(record.supplier_key(), record.amount);
            if !record.source_type.is_empty() {
                source_types.add(&record.source_type, record.amount);
            }
        }

        let mut categories = categories.into_stats();
        rank_by_sum(&mut categories);

        let mut suppliers = suppliers.into_stats();
        rank_by_sum(&mut suppliers);
        let concentration = Self::concentration(&suppliers, summary.total_amount);
        suppliers.truncate(TOP_SUPPLIER_LIMIT);

        AggregationResult {
            summary,
            yearly: yearly.into_stats(),
            quarterly: quarterly.into_stats(),
            monthly: monthly.into_stats(),
            financial_years: financial_years.into_stats(),
            categories,
            top_suppliers: suppliers,
            concentration,
            source_types: source_types.into_stats(),
        }
    }

    /// Dataset-wide totals and invoice-date span.
    pub fn basic_stats(dataset: &NormalizedDataset) -> BasicStats {
        let amounts = dataset.amounts();
        let mut dates = dataset.records.iter().filter_map(|r| r.invoice_date);
        let date_range = dates.next().map(|first| {
            dates.fold(DateRange { start: first, end: first }, |range, d| DateRange {
                start: range.start.min(d),
                end: range.end.max(d),
            })
        });

        BasicStats {
            total_records: dataset.len(),
            records_with_amount: amounts.len(),
            total_amount: amounts.iter().sum(),
            average_payment: stats::mean(&amounts),
            date_range,
        }
    }

    /// `ranked` must already be sorted by sum, descending.
    fn concentration(ranked: &[GroupStats], total: f64) -> SupplierConcentration {
        let top: f64 = ranked.iter().take(CONCENTRATION_TOP_N).map(|g| g.sum).sum();
        SupplierConcentration {
            top_10_percentage: checked_percentage(top, total, 2),
            total_suppliers: ranked.len(),
            total_spending: total,
        }
    }
}

fn quarter_key(date: NaiveDate) -> String {
    format!("{}-Q{}", date.year(), (date.month() - 1) / 3 + 1)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use spend_core::models::{PaymentRecord, ServiceCategory, UNKNOWN_SUPPLIER};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payment(
        supplier: Option<&str>,
        invoice: Option<NaiveDate>,
        amount: Option<f64>,
        category: ServiceCategory,
    ) -> PaymentRecord {
        PaymentRecord {
            supplier_name: supplier.map(str::to_string),
            invoice_date: invoice,
            amount,
            service_category: Some(category),
            source_type: "on_time_payments".to_string(),
            financial_year: "2022-23".to_string(),
            ..Default::default()
        }
    }

    fn dataset(records: Vec<PaymentRecord>) -> NormalizedDataset {
        let mut ds = NormalizedDataset::new("test");
        ds.records = records;
        ds
    }

    fn scenario() -> NormalizedDataset {
        dataset(vec![
            payment(Some("Acme"), Some(date(2023, 1, 1)), Some(1000.0), ServiceCategory::DetentionServices),
            payment(Some("Beta"), Some(date(2023, 2, 1)), Some(500.0), ServiceCategory::CommunityServices),
            payment(Some("Gamma"), Some(date(2023, 3, 1)), Some(2_000_000.0), ServiceCategory::Other),
        ])
    }

    // ── temporal ──────────────────────────────────────────────────────────────

    #[test]
    fn test_yearly_scenario() {
        let result = Aggregator::aggregate(&scenario());
        assert_eq!(result.yearly.len(), 1);
        assert_eq!(result.yearly[0].key, "2023");
        assert_eq!(result.yearly[0].sum, 2_001_500.0);
        assert_eq!(result.yearly[0].count, 3);
    }

    #[test]
    fn test_yearly_sorted_and_skips_undated() {
        let result = Aggregator::aggregate(&dataset(vec![
            payment(Some("A"), Some(date(2024, 5, 1)), Some(10.0), ServiceCategory::Other),
            payment(Some("A"), None, Some(99.0), ServiceCategory::Other),
            payment(Some("A"), Some(date(2021, 5, 1)), Some(5.0), ServiceCategory::Other),
        ]));
        let keys: Vec<&str> = result.yearly.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["2021", "2024"]);
        // The undated record still counts for category and supplier.
        assert_eq!(result.categories[0].sum, 114.0);
        assert_eq!(result.top_suppliers[0].records, 3);
    }

    #[test]
    fn test_quarterly_and_monthly_keys() {
        let result = Aggregator::aggregate(&dataset(vec![
            payment(Some("A"), Some(date(2023, 1, 15)), Some(10.0), ServiceCategory::Other),
            payment(Some("A"), Some(date(2023, 3, 31)), Some(30.0), ServiceCategory::Other),
            payment(Some("A"), Some(date(2023, 10, 1)), Some(7.0), ServiceCategory::Other),
            payment(Some("A"), Some(date(2024, 1, 2)), Some(50.0), ServiceCategory::Other),
        ]));
        let quarters: Vec<(&str, f64)> =
            result.quarterly.iter().map(|p| (p.key.as_str(), p.sum)).collect();
        assert_eq!(quarters, vec![("2023-Q1", 40.0), ("2023-Q4", 7.0), ("2024-Q1", 50.0)]);

        let january = result.monthly.iter().find(|p| p.key == "01").unwrap();
        assert_eq!(january.mean, Some(30.0));
        assert_eq!(result.monthly.len(), 3);
    }

    #[test]
    fn test_financial_year_sums() {
        let mut records = scenario().records;
        records[2].financial_year = "2023-24".to_string();
        let result = Aggregator::aggregate(&dataset(records));
        let fy: Vec<(&str, f64)> = result
            .financial_years
            .iter()
            .map(|p| (p.key.as_str(), p.sum))
            .collect();
        assert_eq!(fy, vec![("2022-23", 1500.0), ("2023-24", 2_000_000.0)]);
    }

    // ── category ──────────────────────────────────────────────────────────────

    #[test]
    fn test_category_partition_invariant() {
        let ds = dataset(vec![
            payment(Some("A"), None, Some(12.5), ServiceCategory::LegalServices),
            payment(Some("B"), None, Some(-3.0), ServiceCategory::HealthServices),
            payment(Some("C"), None, Some(700.0), ServiceCategory::LegalServices),
            payment(Some("D"), None, Some(41.25), ServiceCategory::Other),
        ]);
        let result = Aggregator::aggregate(&ds);
        let category_total: f64 = result.categories.iter().map(|c| c.sum).sum();
        assert!((category_total - result.summary.total_amount).abs() < 1e-9);
    }

    #[test]
    fn test_category_sorted_by_sum_desc() {
        let result = Aggregator::aggregate(&scenario());
        let keys: Vec<&str> = result.categories.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["other", "detention_services", "community_services"]);
    }

    #[test]
    fn test_group_stats_median_and_std() {
        let result = Aggregator::aggregate(&dataset(vec![
            payment(Some("A"), None, Some(2.0), ServiceCategory::Accommodation),
            payment(Some("A"), None, Some(4.0), ServiceCategory::Accommodation),
            payment(Some("A"), None, Some(9.0), ServiceCategory::Accommodation),
        ]));
        let group = &result.categories[0];
        assert_eq!(group.count, 3);
        assert_eq!(group.mean, Some(5.0));
        assert_eq!(group.median, Some(4.0));
        // deviations -3, -1, 4 → 26 / 2
        assert!((group.std_dev.unwrap() - 13.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_unset_amount_excluded_from_numeric_aggregate() {
        let result = Aggregator::aggregate(&dataset(vec![
            payment(Some("A"), Some(date(2023, 1, 1)), None, ServiceCategory::Other),
            payment(Some("A"), Some(date(2023, 1, 1)), Some(8.0), ServiceCategory::Other),
        ]));
        let group = &result.categories[0];
        assert_eq!(group.records, 2);
        assert_eq!(group.count, 1);
        assert_eq!(group.mean, Some(8.0));
        assert_eq!(result.yearly[0].count, 1);
        assert_eq!(result.summary.records_with_amount, 1);
        assert_eq!(result.summary.total_records, 2);
    }

    // ── supplier ──────────────────────────────────────────────────────────────

    #[test]
    fn test_missing_supplier_grouped_as_unknown() {
        let result = Aggregator::aggregate(&dataset(vec![
            payment(None, None, Some(5.0), ServiceCategory::Other),
            payment(Some("A"), None, Some(1.0), ServiceCategory::Other),
            payment(None, None, Some(6.0), ServiceCategory::Other),
        ]));
        assert_eq!(result.top_suppliers[0].key, UNKNOWN_SUPPLIER);
        assert_eq!(result.top_suppliers[0].sum, 11.0);
        assert_eq!(result.concentration.total_suppliers, 2);
    }

    #[test]
    fn test_supplier_ties_keep_input_order() {
        let result = Aggregator::aggregate(&dataset(vec![
            payment(Some("Zeta"), None, Some(100.0), ServiceCategory::Other),
            payment(Some("Small"), None, Some(1.0), ServiceCategory::Other),
            payment(Some("Alpha"), None, Some(100.0), ServiceCategory::Other),
        ]));
        let keys: Vec<&str> = result.top_suppliers.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Small"]);
    }

    #[test]
    fn test_top_suppliers_truncated_and_concentration() {
        let records: Vec<PaymentRecord> = (1..=25)
            .map(|i| {
                let name = format!("S{i:02}");
                payment(Some(&name), None, Some(i as f64), ServiceCategory::Other)
            })
            .collect();
        let result = Aggregator::aggregate(&dataset(records));

        assert_eq!(result.top_suppliers.len(), TOP_SUPPLIER_LIMIT);
        assert_eq!(result.top_suppliers[0].key, "S25");
        assert_eq!(result.concentration.total_suppliers, 25);
        // top ten: 16..=25 → 205 of 325
        assert_eq!(result.concentration.top_10_percentage, Some(63.08));
    }

    #[test]
    fn test_concentration_undefined_for_zero_total() {
        let result = Aggregator::aggregate(&dataset(vec![
            payment(Some("A"), None, Some(5.0), ServiceCategory::Other),
            payment(Some("B"), None, Some(-5.0), ServiceCategory::Other),
        ]));
        assert_eq!(result.concentration.top_10_percentage, None);
        assert_eq!(result.concentration.total_spending, 0.0);
    }

    // ── summary / source types ────────────────────────────────────────────────

    #[test]
    fn test_basic_stats_scenario() {
        let summary = Aggregator::basic_stats(&scenario());
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.total_amount, 2_001_500.0);
        assert!((summary.average_payment.unwrap() - 2_001_500.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            summary.date_range,
            Some(DateRange {
                start: date(2023, 1, 1),
                end: date(2023, 3, 1)
            })
        );
    }

    #[test]
    fn test_empty_dataset() {
        let result = Aggregator::aggregate(&NormalizedDataset::new("empty"));
        assert_eq!(result.summary.total_records, 0);
        assert_eq!(result.summary.average_payment, None);
        assert!(result.summary.date_range.is_none());
        assert!(result.yearly.is_empty());
        assert!(result.categories.is_empty());
        assert_eq!(result.concentration.top_10_percentage, None);
    }

    #[test]
    fn test_source_type_breakdown() {
        let mut records = scenario().records;
        records[1].source_type = "dcyjma_consultancies".to_string();
        let result = Aggregator::aggregate(&dataset(records));
        let keys: Vec<(&str, usize)> = result
            .source_types
            .iter()
            .map(|g| (g.key.as_str(), g.records))
            .collect();
        assert_eq!(keys, vec![("on_time_payments", 2), ("dcyjma_consultancies", 1)]);
    }

    #[test]
    fn test_scoped_aggregation() {
        let mut records = scenario().records;
        records[2].source_type = "dcyjma_consultancies".to_string();
        let ds = dataset(records);
        let result = Aggregator::aggregate(&ds.scoped_to("on_time_payments"));
        assert_eq!(result.summary.total_amount, 1500.0);
        assert_eq!(result.source_types.len(), 1);
    }
}
