//! Column reconciliation and type coercion onto [`PaymentRecord`].
//!
//! Origin headers are looked up in an ordered table; unknown columns ride
//! along untouched. Parse failures leave the field unset and never drop a row.

use spend_core::data_processors::{AmountParser, DateParser};
use spend_core::models::{NormalizedDataset, PaymentRecord, RawDataset, ServiceCategory};

/// Canonical and metadata fields an origin column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Supplier,
    InvoiceDate,
    PaymentDate,
    Amount,
    Description,
    Category,
    ServiceCategory,
    SourceType,
    FinancialYear,
    CollectionDate,
    Dataset,
}

/// Known origin column names, in lookup order.
pub const COLUMN_TABLE: &[(&str, Field)] = &[
    ("Supplier", Field::Supplier),
    ("Supplier Name", Field::Supplier),
    ("Vendor", Field::Supplier),
    ("Payee", Field::Supplier),
    ("Consultant", Field::Supplier),
    ("supplier_name", Field::Supplier),
    ("Invoice Date", Field::InvoiceDate),
    ("invoice_date", Field::InvoiceDate),
    ("Payment Date", Field::PaymentDate),
    ("Date Paid", Field::PaymentDate),
    ("payment_date", Field::PaymentDate),
    ("Invoice Amount", Field::Amount),
    ("Amount", Field::Amount),
    ("Amount Paid", Field::Amount),
    ("Total Cost", Field::Amount),
    ("Expenditure", Field::Amount),
    ("Description", Field::Description),
    ("Purpose", Field::Description),
    ("Service Description", Field::Description),
    ("Category", Field::Category),
    ("service_category", Field::ServiceCategory),
    ("source_type", Field::SourceType),
    ("financial_year", Field::FinancialYear),
    ("collection_date", Field::CollectionDate),
    ("dataset", Field::Dataset),
];

/// Resolve an origin header: exact match first, then case-insensitive.
pub fn lookup_column(header: &str) -> Option<Field> {
    if let Some((_, field)) = COLUMN_TABLE.iter().find(|(name, _)| *name == header) {
        return Some(*field);
    }
    let header = header.trim();
    COLUMN_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(header))
        .map(|(_, field)| *field)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Mapped(Field),
    Extra,
}

/// Per-column plan; a field claimed twice keeps its first column.
fn plan_columns(headers: &[String]) -> Vec<Slot> {
    let mut claimed: Vec<Field> = Vec::new();
    headers
        .iter()
        .map(|header| match lookup_column(header) {
            Some(field) if !claimed.contains(&field) => {
                claimed.push(field);
                Slot::Mapped(field)
            }
            _ => Slot::Extra,
        })
        .collect()
}

/// Values stamped on every record unless the row carries its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDefaults {
    pub source_type: String,
    pub financial_year: String,
    pub collection_date: Option<String>,
    pub dataset: String,
}

impl RecordDefaults {
    pub fn from_raw(raw: &RawDataset) -> Self {
        Self {
            source_type: raw.provenance.source_id.clone(),
            financial_year: raw.provenance.period.clone(),
            collection_date: Some(raw.provenance.collected_at.to_rfc3339()),
            dataset: raw.name(),
        }
    }
}

// ── Normalizer ────────────────────────────────────────────────────────────────

pub struct Normalizer {
    amounts: AmountParser,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            amounts: AmountParser::new(),
        }
    }

    /// One record per raw row, in row order, tagged with provenance.
    pub fn normalize(&self, raw: &RawDataset) -> NormalizedDataset {
        self.normalize_rows(
            raw.name(),
            &raw.headers,
            &raw.rows,
            &RecordDefaults::from_raw(raw),
        )
    }

    /// Normalize a header/rows table that did not come straight from a fetch.
    pub fn normalize_rows(
        &self,
        name: impl Into<String>,
        headers: &[String],
        rows: &[Vec<String>],
        defaults: &RecordDefaults,
    ) -> NormalizedDataset {
        let plan = plan_columns(headers);

        let mut dataset = NormalizedDataset::new(name);
        for (header, slot) in headers.iter().zip(&plan) {
            if *slot == Slot::Extra && !dataset.extra_columns.contains(header) {
                dataset.extra_columns.push(header.clone());
            }
        }

        dataset.records = rows
            .iter()
            .map(|row| self.build_record(headers, &plan, row, defaults))
            .collect();
        dataset
    }

    fn build_record(
        &self,
        headers: &[String],
        plan: &[Slot],
        row: &[String],
        defaults: &RecordDefaults,
    ) -> PaymentRecord {
        let mut record = PaymentRecord {
            source_type: defaults.source_type.clone(),
            financial_year: defaults.financial_year.clone(),
            collection_date: defaults.collection_date.clone(),
            dataset: defaults.dataset.clone(),
            ..Default::default()
        };

        for ((header, slot), value) in headers.iter().zip(plan).zip(row) {
            let field = match slot {
                Slot::Mapped(field) => *field,
                Slot::Extra => {
                    record.extras.push((header.clone(), value.clone()));
                    continue;
                }
            };
            let Some(text) = non_blank(value) else {
                continue;
            };
            match field {
                Field::Supplier => record.supplier_name = Some(text),
                Field::InvoiceDate => record.invoice_date = DateParser::parse(&text),
                Field::PaymentDate => record.payment_date = DateParser::parse(&text),
                Field::Amount => record.amount = self.amounts.parse(&text),
                Field::Description => record.description = Some(text),
                Field::Category => record.category = Some(text),
                Field::ServiceCategory => {
                    record.service_category = ServiceCategory::from_label(&text)
                }
                Field::SourceType => record.source_type = text,
                Field::FinancialYear => record.financial_year = text,
                Field::CollectionDate => record.collection_date = Some(text),
                Field::Dataset => record.dataset = text,
            }
        }
        record
    }
}

/// Convenience wrapper around a throwaway [`Normalizer`].
pub fn normalize(raw: &RawDataset) -> NormalizedDataset {
    Normalizer::new().normalize(raw)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use spend_core::models::Provenance;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawDataset {
        RawDataset {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            provenance: Provenance::new("on_time_payments", "2024-25"),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_three_row_scenario_amounts() {
        let input = raw(
            &["Supplier", "Invoice Date", "Payment Date", "Invoice Amount", "Description"],
            &[
                &["Acme", "2023-01-01", "2023-01-10", "$1,000.00", "detention services"],
                &["Beta", "2023-02-01", "2023-05-10", "500", "community supervision"],
                &["Gamma", "2023-03-01", "2023-03-05", "2,000,000", "other"],
            ],
        );
        let dataset = normalize(&input);

        assert_eq!(dataset.amounts(), vec![1000.0, 500.0, 2_000_000.0]);
        assert_eq!(dataset.records[1].supplier_name.as_deref(), Some("Beta"));
        assert_eq!(dataset.records[1].invoice_date, Some(date(2023, 2, 1)));
        assert_eq!(dataset.records[1].payment_date, Some(date(2023, 5, 10)));
        assert_eq!(dataset.name, "on_time_payments_2024-25");
    }

    #[test]
    fn test_row_count_preserved_when_everything_fails() {
        let input = raw(
            &["Invoice Date", "Amount"],
            &[&["garbage", "N/A"], &["", ""], &["31/02/2023", "$"]],
        );
        let dataset = normalize(&input);

        assert_eq!(dataset.len(), 3);
        assert!(dataset.records.iter().all(|r| r.amount.is_none()));
        assert!(dataset.records.iter().all(|r| r.invoice_date.is_none()));
    }

    #[test]
    fn test_missing_canonical_fields_are_unset() {
        let input = raw(&["Amount"], &[&["10"]]);
        let record = &normalize(&input).records[0];
        assert!(record.supplier_name.is_none());
        assert!(record.invoice_date.is_none());
        assert!(record.description.is_none());
        assert_eq!(record.amount, Some(10.0));
    }

    #[test]
    fn test_provenance_tags_every_record() {
        let input = raw(&["Supplier"], &[&["Acme"], &["Beta"]]);
        let dataset = normalize(&input);
        for record in &dataset.records {
            assert_eq!(record.source_type, "on_time_payments");
            assert_eq!(record.financial_year, "2024-25");
            assert_eq!(record.dataset, "on_time_payments_2024-25");
            assert!(record.collection_date.is_some());
        }
    }

    #[test]
    fn test_unknown_columns_preserved() {
        let input = raw(&["Supplier", "Branch", "Ref"], &[&["Acme", "North", "R-1"]]);
        let dataset = normalize(&input);
        assert_eq!(dataset.extra_columns, vec!["Branch", "Ref"]);
        assert_eq!(dataset.records[0].extra("Branch"), Some("North"));
        assert_eq!(dataset.records[0].extra("Ref"), Some("R-1"));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        assert_eq!(lookup_column("supplier name"), Some(Field::Supplier));
        assert_eq!(lookup_column(" DATE PAID "), Some(Field::PaymentDate));
        assert_eq!(lookup_column("amount"), Some(Field::Amount));
        assert_eq!(lookup_column("Branch"), None);
    }

    #[test]
    fn test_duplicate_mapping_first_wins() {
        let input = raw(&["Vendor", "Payee"], &[&["First Co", "Second Co"]]);
        let dataset = normalize(&input);
        assert_eq!(dataset.records[0].supplier_name.as_deref(), Some("First Co"));
        assert_eq!(dataset.records[0].extra("Payee"), Some("Second Co"));
    }

    #[test]
    fn test_metadata_columns_override_defaults() {
        let input = raw(
            &["supplier_name", "amount", "service_category", "source_type", "financial_year", "dataset"],
            &[&["Acme", "12.5", "legal_services", "dcyjma_consultancies", "2021-22", "dcyjma_consultancies_2021-22"]],
        );
        let record = &normalize(&input).records[0];
        assert_eq!(record.source_type, "dcyjma_consultancies");
        assert_eq!(record.financial_year, "2021-22");
        assert_eq!(record.dataset, "dcyjma_consultancies_2021-22");
        assert_eq!(record.service_category, Some(ServiceCategory::LegalServices));
        assert_eq!(record.amount, Some(12.5));
    }

    #[test]
    fn test_source_category_column_kept_uninterpreted() {
        let input = raw(&["Category", "Amount"], &[&["Professional Services", "5"]]);
        let record = &normalize(&input).records[0];
        assert_eq!(record.category.as_deref(), Some("Professional Services"));
        assert!(record.service_category.is_none());
    }

    #[test]
    fn test_negative_amount_sign_kept() {
        let input = raw(&["Amount"], &[&["(250.00)"], &["-3"]]);
        assert_eq!(normalize(&input).amounts(), vec![-250.0, -3.0]);
    }
}
