use std::sync::Arc;

use crate::config::InsertionMode;
use crate::db::record_repo::ScrapedRecord;
use crate::publish::{EntityInserter, InsertOutcome};
use crate::worker::InsertWorkerPool;

use super::context::RunContext;

/// What happened to a transferred record's entities.
#[derive(Debug)]
pub enum InsertionResult {
    Inserted(InsertOutcome),
    Dispatched { unit_id: String },
    Failed(String),
}

/// How the runner publishes a transferred record.
pub trait InsertionStrategy: Send + Sync {
    fn mode(&self) -> InsertionMode;

    fn insert(&self, record: &ScrapedRecord, ctx: &RunContext) -> InsertionResult;
}

/// Publishes within the run, bounded by the run's soft deadline.
pub struct InlineInsertion {
    inserter: EntityInserter,
}

impl InlineInsertion {
    pub fn new(inserter: EntityInserter) -> Self {
        Self { inserter }
    }
}

impl InsertionStrategy for InlineInsertion {
    fn mode(&self) -> InsertionMode {
        InsertionMode::Inline
    }

    fn insert(&self, record: &ScrapedRecord, ctx: &RunContext) -> InsertionResult {
        match self.inserter.insert_for_record(record, ctx.deadline()) {
            Ok(outcome) => InsertionResult::Inserted(outcome),
            Err(e) => {
                tracing::error!(record_id = record.id, error = %e, "Inline insertion failed");
                InsertionResult::Failed(e.to_string())
            }
        }
    }
}

/// Hands each record to the insertion worker pool as its own unit.
pub struct QueuedInsertion {
    pool: Arc<InsertWorkerPool>,
}

impl QueuedInsertion {
    pub fn new(pool: Arc<InsertWorkerPool>) -> Self {
        Self { pool }
    }
}

impl InsertionStrategy for QueuedInsertion {
    fn mode(&self) -> InsertionMode {
        InsertionMode::Queued
    }

    fn insert(&self, record: &ScrapedRecord, _ctx: &RunContext) -> InsertionResult {
        match self.pool.submit(record.id) {
            Ok(unit_id) => InsertionResult::Dispatched { unit_id },
            Err(e) => {
                tracing::error!(record_id = record.id, error = %e, "Failed to queue insertion");
                InsertionResult::Failed(e.to_string())
            }
        }
    }
}
