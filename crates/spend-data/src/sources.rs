//! Static catalogue of published data sources.
//!
//! The built-in catalogue covers the Queensland youth-justice payment and
//! consultancy disclosures. A JSON file with the same shape can replace it;
//! adding a source is a configuration change, not a code change.

use std::path::Path;

use spend_core::models::{DataSource, SourceFormat, SourcePeriod};
use spend_core::{Result, SpendError};

const ON_TIME_PAYMENTS_2024_25: &str =
    "https://www.families.qld.gov.au/_media/documents/open-data/dyjvs-ontimepayments-2024-25.csv";
const DCYJMA_CONSULTANCIES_2021_22: &str = "https://www.data.qld.gov.au/dataset/dcyjma-consultancies/resource/b8f8c8e0-8b4a-4b4a-9b4a-4b4a9b4a4b4a/download/dcyjma-consultancies-2021-22.csv";
const DCYJMA_CONSULTANCIES_2020_21: &str = "https://www.data.qld.gov.au/dataset/dcyjma-consultancies/resource/a8f8c8e0-8b4a-4b4a-9b4a-4b4a9b4a4b4a/download/dcyjma-consultancies-2020-21.csv";
const YJ_CONSULTANCIES_2019_20: &str = "https://www.data.qld.gov.au/dataset/consultancies-department-of-youth-justice/resource/c8f8c8e0-8b4a-4b4a-9b4a-4b4a9b4a4b4a/download/youth-justice-consultancies-2019-20.csv";

/// Read-only catalogue of sources, fixed at process start.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<DataSource>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<DataSource>) -> Self {
        Self { sources }
    }

    /// The built-in catalogue.
    pub fn builtin() -> Self {
        Self::new(vec![
            source(
                "on_time_payments",
                "Current DYJVS on-time payments data",
                SourceFormat::Csv,
                &[("2024-25", ON_TIME_PAYMENTS_2024_25)],
            ),
            source(
                "dcyjma_consultancies",
                "Department of Children, Youth Justice and Multicultural Affairs consultancy spending",
                SourceFormat::Csv,
                &[
                    ("2021-22", DCYJMA_CONSULTANCIES_2021_22),
                    ("2020-21", DCYJMA_CONSULTANCIES_2020_21),
                ],
            ),
            source(
                "youth_justice_consultancies",
                "Department of Youth Justice consultancy spending",
                SourceFormat::Csv,
                &[("2019-20", YJ_CONSULTANCIES_2019_20)],
            ),
            source(
                "annual_reports",
                "Youth Justice annual reports with financial statements",
                SourceFormat::Pdf,
                &[
                    ("2023-24", "https://www.publications.qld.gov.au/ckan-publications-attachments-prod/resources/3e45ff41-5e61-46c3-9d16-f3116cc70b4c/yj-annual-report-2023-2024.pdf"),
                    ("2022-23", "https://www.youthjustice.qld.gov.au/sites/default/files/2023-10/annual-report-2022-23.pdf"),
                    ("2021-22", "https://www.youthjustice.qld.gov.au/sites/default/files/2022-10/annual-report-2021-22.pdf"),
                    ("2020-21", "https://www.youthjustice.qld.gov.au/sites/default/files/2021-10/annual-report-2020-21.pdf"),
                ],
            ),
        ])
    }

    /// Load a catalogue from a JSON array of sources.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SpendError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let sources: Vec<DataSource> = serde_json::from_str(&content)?;
        if let Some(dup) = first_duplicate_id(&sources) {
            return Err(SpendError::Config(format!(
                "source id \"{dup}\" appears more than once in {}",
                path.display()
            )));
        }
        Ok(Self::new(sources))
    }

    /// Every catalogued source, in declaration order.
    pub fn list_sources(&self) -> &[DataSource] {
        &self.sources
    }

    pub fn find(&self, id: &str) -> Option<&DataSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Sources the collector can parse as delimited text.
    pub fn tabular_sources(&self) -> impl Iterator<Item = &DataSource> {
        self.sources.iter().filter(|s| s.is_tabular())
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn source(id: &str, description: &str, format: SourceFormat, periods: &[(&str, &str)]) -> DataSource {
    DataSource {
        id: id.to_string(),
        description: description.to_string(),
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

fn first_duplicate_id(sources: &[DataSource]) -> Option<&str> {
    sources.iter().enumerate().find_map(|(i, s)| {
        sources[..i]
            .iter()
            .any(|earlier| earlier.id == s.id)
            .then_some(s.id.as_str())
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
