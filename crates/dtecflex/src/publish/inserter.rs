use std::time::Instant;

use rusqlite::Connection;
use serde::Serialize;

use crate::category::Category;
use crate::db::aux_repo::{self, AuxiliaryRow};
use crate::db::record_repo::{self, ScrapedRecord};
use crate::db::{entity_repo, now_timestamp, Database, DatabaseError};
use crate::error::PublishError;

use super::aux_row::build_row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// The whole batch committed in one transaction.
    Committed,
    /// The batch transaction failed and each row was retried alone.
    RowFallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowResult {
    pub entity_id: i64,
    pub outcome: Result<(), String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub index: usize,
    pub mode: BatchMode,
    pub rows: Vec<RowResult>,
}

impl BatchReport {
    pub fn inserted(&self) -> usize {
        self.rows.iter().filter(|r| r.outcome.is_ok()).count()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InsertReport {
    pub batches: Vec<BatchReport>,
    /// Set when the deadline stopped the remaining batches.
    pub truncated: bool,
}

impl InsertReport {
    pub fn inserted(&self) -> usize {
        self.batches.iter().map(BatchReport::inserted).sum()
    }

    pub fn rejected(&self) -> Vec<&RowResult> {
        self.batches
            .iter()
            .flat_map(|b| b.rows.iter())
            .filter(|r| r.outcome.is_err())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertOutcome {
    pub record_id: i64,
    pub inserted: usize,
    pub published: bool,
    pub report: InsertReport,
}

/// Publishes a transferred record's entities to the auxiliary index.
pub struct EntityInserter {
    db: Database,
    chunk_size: usize,
}

impl EntityInserter {
    pub fn new(db: Database, chunk_size: usize) -> Self {
        Self {
            db,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Loads the record first; used by queued units that only carry an id.
    pub fn insert_for_record_id(
        &self,
        record_id: i64,
        deadline: Option<Instant>,
    ) -> Result<InsertOutcome, PublishError> {
        let record = record_repo::find_by_id(&self.db, record_id)?
            .ok_or(PublishError::RecordNotFound(record_id))?;
        self.insert_for_record(&record, deadline)
    }

    /// Inserts one index row per entity in chunks, then advances the record
    /// to published when at least one row committed.
    pub fn insert_for_record(
        &self,
        record: &ScrapedRecord,
        deadline: Option<Instant>,
    ) -> Result<InsertOutcome, PublishError> {
        let category = record
            .category
            .as_deref()
            .and_then(|c| Category::normalize(c).ok())
            .ok_or(PublishError::UnknownCategory {
                record_id: record.id,
            })?;

        let entities = entity_repo::find_by_record(&self.db, record.id)?;
        let now = now_timestamp();
        let rows: Vec<(i64, AuxiliaryRow)> = entities
            .iter()
            .map(|e| (e.id, build_row(record, e, category, &now)))
            .collect();

        let mut report = InsertReport::default();
        for (index, chunk) in rows.chunks(self.chunk_size).enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(
                    record_id = record.id,
                    remaining = rows.len() - index * self.chunk_size,
                    "Insertion deadline reached, skipping remaining rows"
                );
                report.truncated = true;
                break;
            }
            report.batches.push(self.insert_chunk(index, chunk)?);
        }

        let inserted = report.inserted();
        let published = if inserted > 0 {
            record_repo::mark_published(&self.db, record.id)?
        } else {
            false
        };

        if entities.is_empty() {
            tracing::info!(record_id = record.id, "No entities to publish");
        } else {
            tracing::info!(
                record_id = record.id,
                entities = entities.len(),
                inserted,
                published,
                "Published entity rows"
            );
        }

        Ok(InsertOutcome {
            record_id: record.id,
            inserted,
            published,
            report,
        })
    }

    fn insert_chunk(
        &self,
        index: usize,
        chunk: &[(i64, AuxiliaryRow)],
    ) -> Result<BatchReport, DatabaseError> {
        self.db.with_conn_mut(|conn| match commit_batch(conn, chunk) {
            Ok(()) => Ok(BatchReport {
                index,
                mode: BatchMode::Committed,
                rows: chunk
                    .iter()
                    .map(|(id, _)| RowResult {
                        entity_id: *id,
                        outcome: Ok(()),
                    })
                    .collect(),
            }),
            Err(e) => {
                log::warn!(
                    "Batch {} of {} rows rolled back ({}), retrying row by row",
                    index,
                    chunk.len(),
                    e
                );
                let conn: &Connection = conn;
                let rows = chunk
                    .iter()
                    .map(|(id, row)| RowResult {
                        entity_id: *id,
                        outcome: aux_repo::insert_with(conn, row).map_err(|e| {
                            log::warn!("Rejected index row for entity {}: {}", id, e);
                            e.to_string()
                        }),
                    })
                    .collect();
                Ok(BatchReport {
                    index,
                    mode: BatchMode::RowFallback,
                    rows,
                })
            }
        })
    }
}

/// All-or-nothing insert; dropping the transaction on error rolls it back.
fn commit_batch(conn: &mut Connection, chunk: &[(i64, AuxiliaryRow)]) -> Result<(), DatabaseError> {
    let tx = conn.transaction()?;
    for (_, row) in chunk {
        aux_repo::insert_with(&tx, row)?;
    }
    tx.commit()?;
    Ok(())
}
