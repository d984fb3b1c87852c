use serde::Serialize;

use crate::config::InsertionMode;
use crate::request::RunKey;
use crate::selector::SelectedRecord;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedRecord {
    pub record_id: i64,
    pub registration: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DispatchedUnit {
    pub unit_id: String,
    pub record_id: i64,
}

/// Insertion side of a run, shaped by the strategy in use.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum InsertionSummary {
    Inline {
        inserted: usize,
        published: Vec<i64>,
        not_published: Vec<i64>,
    },
    Queued {
        dispatched: Vec<DispatchedUnit>,
        not_dispatched: Vec<i64>,
    },
}

impl InsertionSummary {
    pub fn empty(mode: InsertionMode) -> Self {
        match mode {
            InsertionMode::Inline => InsertionSummary::Inline {
                inserted: 0,
                published: Vec::new(),
                not_published: Vec::new(),
            },
            InsertionMode::Queued => InsertionSummary::Queued {
                dispatched: Vec::new(),
                not_dispatched: Vec::new(),
            },
        }
    }
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub date: String,
    /// Category abbreviation, absent for all-category runs.
    pub category: Option<String>,
    pub key: String,
    /// Records selected.
    pub total: usize,
    pub moved: usize,
    pub failed: usize,
    /// Registration identifiers of moved records.
    pub moved_records: Vec<String>,
    pub failed_records: Vec<FailedRecord>,
    pub insertion: InsertionSummary,
}

impl RunSummary {
    pub fn new(key: &RunKey, total: usize, mode: InsertionMode) -> Self {
        Self {
            date: key.date().to_string(),
            category: key.category().map(|c| c.abbreviation().to_string()),
            key: key.job_key(),
            total,
            moved: 0,
            failed: 0,
            moved_records: Vec::new(),
            failed_records: Vec::new(),
            insertion: InsertionSummary::empty(mode),
        }
    }

    pub fn record_moved(&mut self, selected: &SelectedRecord) {
        self.moved += 1;
        self.moved_records.push(label(selected));
    }

    pub fn record_failed(&mut self, selected: &SelectedRecord, reason: String) {
        self.failed += 1;
        self.failed_records.push(FailedRecord {
            record_id: selected.record.id,
            registration: selected.record.registration.clone(),
            reason,
        });
    }

    pub fn record_inserted(&mut self, record_id: i64, rows: usize, published: bool) {
        if let InsertionSummary::Inline {
            inserted,
            published: published_ids,
            not_published,
        } = &mut self.insertion
        {
            *inserted += rows;
            if published {
                published_ids.push(record_id);
            } else {
                not_published.push(record_id);
            }
        }
    }

    pub fn record_dispatched(&mut self, record_id: i64, unit_id: String) {
        if let InsertionSummary::Queued { dispatched, .. } = &mut self.insertion {
            dispatched.push(DispatchedUnit { unit_id, record_id });
        }
    }

    /// An insertion that raised instead of reporting rows.
    pub fn record_insertion_error(&mut self, record_id: i64) {
        match &mut self.insertion {
            InsertionSummary::Inline { not_published, .. } => not_published.push(record_id),
            InsertionSummary::Queued { not_dispatched, .. } => not_dispatched.push(record_id),
        }
    }
}

fn label(selected: &SelectedRecord) -> String {
    selected
        .record
        .registration
        .clone()
        .unwrap_or_else(|| format!("#{}", selected.record.id))
}
