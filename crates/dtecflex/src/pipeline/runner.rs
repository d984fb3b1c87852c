use std::sync::Arc;

use tracing::{info, info_span, warn};

use crate::broadcast::{RunPhase, StepDetail};
use crate::category::Category;
use crate::config::Config;
use crate::db::Database;
use crate::request::{RunDate, RunKey};
use crate::selector::{RecordSelector, Selection};
use crate::transfer::{FileTransferExecutor, RemoteSync};

use super::context::RunContext;
use super::error::PipelineError;
use super::progress::{ProgressReporter, ProgressUpdate};
use super::strategy::{InsertionResult, InsertionStrategy};
use super::summary::RunSummary;

/// Selection, transfer and insertion for one run key.
pub struct TransferPipeline {
    selector: RecordSelector,
    executor: FileTransferExecutor,
    strategy: Arc<dyn InsertionStrategy>,
}

impl TransferPipeline {
    pub fn new(
        selector: RecordSelector,
        executor: FileTransferExecutor,
        strategy: Arc<dyn InsertionStrategy>,
    ) -> Self {
        Self {
            selector,
            executor,
            strategy,
        }
    }

    pub fn from_config(
        config: &Config,
        db: Database,
        remote: Arc<dyn RemoteSync>,
        strategy: Arc<dyn InsertionStrategy>,
    ) -> Self {
        Self::new(
            RecordSelector::new(db.clone()),
            FileTransferExecutor::new(
                db,
                remote,
                config.media_base.clone(),
                config.remote_base.clone(),
            ),
            strategy,
        )
    }

    /// Runs every approved record of `date` (and `category`, when given)
    /// through transfer and insertion.
    ///
    /// Steps: `START` is 0, record `i` transfers at `2i+1` and inserts at
    /// `2i+2`, `SUMMARY` is `2N+1`. The insertion step is skipped for records
    /// whose transfer failed.
    pub fn run(
        &self,
        date: &RunDate,
        category: Option<&str>,
        progress: &dyn ProgressReporter,
        ctx: &RunContext,
    ) -> Result<RunSummary, PipelineError> {
        let category = Category::normalize_optional(category)?;
        let key = RunKey::new(date.clone(), category);
        let _run_span = info_span!("transfer_run",
            task_id = %ctx.task_id(),
            key = %key,
        )
        .entered();

        let records = {
            let _step = info_span!("select").entered();
            match self.selector.select(&key) {
                Selection::Records(records) => records,
                Selection::NoRecordsFound => Vec::new(),
                Selection::SelectionFailed(reason) => {
                    return Err(PipelineError::SelectionFailed(reason))
                }
            }
        };

        let total = 2 * records.len() + 1;
        let mut summary = RunSummary::new(&key, records.len(), self.strategy.mode());
        progress.report(ProgressUpdate::new(0, total, RunPhase::Start, StepDetail::default()));

        for (i, selected) in records.iter().enumerate() {
            ctx.check()?;
            let record_id = selected.record.id;

            let transferred = {
                let _step = info_span!("transfer", record_id).entered();
                match self.executor.transfer(selected, date) {
                    Ok(moved) => {
                        summary.record_moved(selected);
                        Some(moved.status_updated)
                    }
                    Err(e) => {
                        warn!(record_id, error = %e, "Transfer failed");
                        summary.record_failed(selected, e.to_string());
                        None
                    }
                }
            };

            progress.report(ProgressUpdate::new(
                2 * i + 1,
                total,
                RunPhase::Transferring,
                StepDetail {
                    last: selected.record.registration.clone(),
                    record_id: Some(record_id),
                    transfer_ok: Some(transferred.is_some()),
                    ..Default::default()
                },
            ));

            match transferred {
                Some(true) => {}
                Some(false) => {
                    warn!(record_id, "Status not advanced after copy, insertion skipped");
                    continue;
                }
                None => continue,
            }

            let mut detail = StepDetail {
                last: selected.record.registration.clone(),
                record_id: Some(record_id),
                ..Default::default()
            };
            {
                let _step = info_span!("insert", record_id).entered();
                match self.strategy.insert(&selected.record, ctx) {
                    InsertionResult::Inserted(outcome) => {
                        summary.record_inserted(record_id, outcome.inserted, outcome.published);
                        detail.inserted_for_news = Some(outcome.inserted);
                        detail.published = Some(outcome.published);
                    }
                    InsertionResult::Dispatched { unit_id } => {
                        summary.record_dispatched(record_id, unit_id.clone());
                        detail.unit_id = Some(unit_id);
                    }
                    InsertionResult::Failed(error) => {
                        summary.record_insertion_error(record_id);
                        detail.error = Some(error);
                    }
                }
            }
            progress.report(ProgressUpdate::new(2 * i + 2, total, RunPhase::Inserting, detail));
        }

        info!(
            moved = summary.moved,
            failed = summary.failed,
            total = summary.total,
            "Transfer run finished"
        );
        progress.report(ProgressUpdate::new(
            total,
            total,
            RunPhase::Summary,
            StepDetail {
                summary: Some(summary.clone()),
                ..Default::default()
            },
        ));

        Ok(summary)
    }
}
