use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Column order of every processed snapshot written by the pipeline.
///
/// `category` and the two provenance columns trail the canonical eight.
pub const PROCESSED_COLUMNS: &[&str] = &[
    "supplier_name",
    "invoice_date",
    "payment_date",
    "amount",
    "description",
    "service_category",
    "source_type",
    "financial_year",
    "category",
    "collection_date",
    "dataset",
];

/// Supplier key used when a record carries no supplier name.
pub const UNKNOWN_SUPPLIER: &str = "unknown";

// ── Sources ───────────────────────────────────────────────────────────────────

/// Payload type published at a source location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Csv,
    Pdf,
}

/// One reporting period of a source and where it is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePeriod {
    /// Financial-year or period label, e.g. `"2024-25"`.
    pub label: String,
    /// Download URL.
    pub location: String,
}

/// A named, publicly published data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub format: SourceFormat,
    pub periods: Vec<SourcePeriod>,
}

impl DataSource {
    /// Whether the collector can parse this source as delimited text.
    pub fn is_tabular(&self) -> bool {
        self.format == SourceFormat::Csv
    }
}

// ── Raw datasets ──────────────────────────────────────────────────────────────

/// Where a raw dataset came from and when it was collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_id: String,
    pub period: String,
    pub collected_at: DateTime<Utc>,
}

impl Provenance {
    pub fn new(source_id: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            period: period.into(),
            collected_at: Utc::now(),
        }
    }
}

/// Unparsed tabular result of fetching one (source, period) pair.
///
/// Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub provenance: Provenance,
}

impl RawDataset {
    /// Dataset tag, `"<source_id>_<period>"`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.provenance.source_id, self.provenance.period)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Service categories ────────────────────────────────────────────────────────

/// Keyword-derived label describing the nature of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    DetentionServices,
    CommunityServices,
    SupportServices,
    LegalServices,
    EducationServices,
    Accommodation,
    HealthServices,
    Administration,
    Other,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 9] = [
        ServiceCategory::DetentionServices,
        ServiceCategory::CommunityServices,
        ServiceCategory::SupportServices,
        ServiceCategory::LegalServices,
        ServiceCategory::EducationServices,
        ServiceCategory::Accommodation,
        ServiceCategory::HealthServices,
        ServiceCategory::Administration,
        ServiceCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::DetentionServices => "detention_services",
            ServiceCategory::CommunityServices => "community_services",
            ServiceCategory::SupportServices => "support_services",
            ServiceCategory::LegalServices => "legal_services",
            ServiceCategory::EducationServices => "education_services",
            ServiceCategory::Accommodation => "accommodation",
            ServiceCategory::HealthServices => "health_services",
            ServiceCategory::Administration => "administration",
            ServiceCategory::Other => "other",
        }
    }

    /// Parse a label as written in processed snapshots.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Payment records ───────────────────────────────────────────────────────────

/// The canonical unit of analysis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaymentRecord {
    pub supplier_name: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    /// Finite when present; sign preserved.
    pub amount: Option<f64>,
    pub description: Option<String>,
    /// Category column as published by the source, uninterpreted.
    pub category: Option<String>,
    /// Assigned by the categorizer.
    pub service_category: Option<ServiceCategory>,
    pub source_type: String,
    pub financial_year: String,
    pub collection_date: Option<String>,
    pub dataset: String,
    /// Unrecognised origin columns, in header order.
    pub extras: Vec<(String, String)>,
}

impl PaymentRecord {
    /// Service category, `Other` until the categorizer has run.
    pub fn category_label(&self) -> ServiceCategory {
        self.service_category.unwrap_or(ServiceCategory::Other)
    }

    /// Supplier grouping key; blank suppliers collapse to [`UNKNOWN_SUPPLIER`].
    pub fn supplier_key(&self) -> &str {
        self.supplier_name.as_deref().unwrap_or(UNKNOWN_SUPPLIER)
    }

    /// Whole days between invoice and payment. Negative values are kept.
    pub fn payment_delay_days(&self) -> Option<i64> {
        match (self.invoice_date, self.payment_date) {
            (Some(invoice), Some(paid)) => Some((paid - invoice).num_days()),
            _ => None,
        }
    }

    pub fn extra(&self, column: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

/// Ordered sequence of records; insertion order is source row order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedDataset {
    pub name: String,
    pub records: Vec<PaymentRecord>,
    /// Union of uninterpreted column names, first-seen order.
    pub extra_columns: Vec<String>,
}

impl NormalizedDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
            extra_columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All defined amounts, in record order.
    pub fn amounts(&self) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.amount).collect()
    }

    /// Concatenate datasets without merging duplicates.
    pub fn combine(name: impl Into<String>, datasets: Vec<NormalizedDataset>) -> Self {
        let mut combined = NormalizedDataset::new(name);
        for dataset in datasets {
            for column in dataset.extra_columns {
                if !combined.extra_columns.contains(&column) {
                    combined.extra_columns.push(column);
                }
            }
            combined.records.extend(dataset.records);
        }
        combined
    }

    /// A copy restricted to one `source_type` tag.
    pub fn scoped_to(&self, source_type: &str) -> Self {
        NormalizedDataset {
            name: format!("{}[{}]", self.name, source_type),
            records: self
                .records
                .iter()
                .filter(|r| r.source_type == source_type)
                .cloned()
                .collect(),
            extra_columns: self.extra_columns.clone(),
        }
    }
}
