//! Keyword classification of payments into service categories.

use spend_core::models::{NormalizedDataset, PaymentRecord, ServiceCategory};

/// Ordered keyword table. The first category with a matching phrase wins.
pub const CATEGORY_KEYWORDS: &[(ServiceCategory, &[&str])] = &[
    (
        ServiceCategory::DetentionServices,
        &["detention", "custody", "secure", "youth justice centre"],
    ),
    (
        ServiceCategory::CommunityServices,
        &["community", "supervision", "probation", "orders"],
    ),
    (
        ServiceCategory::SupportServices,
        &["counselling", "mental health", "substance abuse", "family"],
    ),
    (
        ServiceCategory::LegalServices,
        &["legal aid", "court", "representation", "advocacy"],
    ),
    (
        ServiceCategory::EducationServices,
        &["education", "training", "vocational", "skills"],
    ),
    (
        ServiceCategory::Accommodation,
        &["housing", "residential", "accommodation", "shelter"],
    ),
    (
        ServiceCategory::HealthServices,
        &["health", "medical", "psychological", "therapy"],
    ),
    (
        ServiceCategory::Administration,
        &["admin", "management", "overhead", "corporate"],
    ),
];

/// Stateless classifier over description and supplier text.
pub struct Categorizer;

impl Categorizer {
    /// Label for free text; `Other` when nothing matches.
    pub fn classify(description: Option<&str>, supplier: Option<&str>) -> ServiceCategory {
        let text = format!(
            "{} {}",
            description.unwrap_or_default(),
            supplier.unwrap_or_default()
        )
        .to_lowercase();

        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(ServiceCategory::Other)
    }

    pub fn categorize(record: &PaymentRecord) -> ServiceCategory {
        Self::classify(record.description.as_deref(), record.supplier_name.as_deref())
    }

    /// Apply the keyword rule to every record, replacing any label the
    /// source supplied. Used on freshly fetched data.
    pub fn recategorize_dataset(dataset: &mut NormalizedDataset) {
        for record in &mut dataset.records {
            record.service_category = Some(Self::categorize(record));
        }
    }

    /// Assign a category to every record that does not already carry one.
    /// Used when reloading processed snapshots.
    pub fn categorize_dataset(dataset: &mut NormalizedDataset) {
        for record in dataset
            .records
            .iter_mut()
            .filter(|r| r.service_category.is_none())
        {
            record.service_category = Some(Self::categorize(record));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
