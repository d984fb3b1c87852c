//! Selection of approved records for a transfer run.

use serde::Serialize;

use crate::category::Category;
use crate::db::record_repo::{self, ScrapedRecord};
use crate::db::Database;
use crate::request::RunKey;

/// An approved record with its derived category, absent when the stored
/// category is not one of the five known names.
#[derive(Debug, Clone, Serialize)]
pub struct SelectedRecord {
    pub record: ScrapedRecord,
    pub category: Option<Category>,
}

impl SelectedRecord {
    pub fn new(record: ScrapedRecord) -> Self {
        let category = record
            .category
            .as_deref()
            .and_then(|c| Category::normalize(c).ok());
        Self { record, category }
    }

    pub fn abbreviation(&self) -> Option<&'static str> {
        self.category.map(Category::abbreviation)
    }

    pub fn path_prefix(&self) -> Option<char> {
        self.category.map(Category::path_prefix)
    }
}

/// Result of a selection. A storage failure is kept apart from an empty
/// result so an outage never looks like a no-op run.
#[derive(Debug)]
pub enum Selection {
    Records(Vec<SelectedRecord>),
    NoRecordsFound,
    SelectionFailed(String),
}

impl Selection {
    pub fn len(&self) -> usize {
        match self {
            Selection::Records(records) => records.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RecordSelector {
    db: Database,
}

impl RecordSelector {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Approved records for `key`, filtered by `{prefix}{date}%` when the
    /// key carries a category. Read-only.
    pub fn select(&self, key: &RunKey) -> Selection {
        let pattern = key.registration_pattern();
        match record_repo::find_approved(&self.db, pattern.as_deref()) {
            Ok(rows) if rows.is_empty() => {
                tracing::info!(key = %key, "No approved records");
                Selection::NoRecordsFound
            }
            Ok(rows) => {
                tracing::info!(key = %key, count = rows.len(), "Selected approved records");
                Selection::Records(rows.into_iter().map(SelectedRecord::new).collect())
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Record selection failed");
                Selection::SelectionFailed(e.to_string())
            }
        }
    }
}
