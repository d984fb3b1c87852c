//! Entry point that wires storage, transport, channel and workers together.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::broadcast::{InMemoryChannel, JobStatusResponse, JobStore, LiveFeed, ProgressChannel};
use crate::config::{Config, InsertionMode};
use crate::db::record_repo::{self, ApprovalReport};
use crate::db::Database;
use crate::error::DtecError;
use crate::pipeline::{InlineInsertion, InsertionStrategy, QueuedInsertion, TransferPipeline};
use crate::publish::EntityInserter;
use crate::request::RunKey;
use crate::task::{TaskDispatcher, TaskLimits, TransferTask};
use crate::transfer::{remote_from_config, RemoteSync};
use crate::worker::InsertWorkerPool;

/// Immediate answer to a trigger; the run itself proceeds in the background.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TriggerResponse {
    pub job_id: String,
    pub message: String,
    pub date: String,
    pub category: Option<String>,
}

pub struct TransferService {
    db: Database,
    channel: Arc<dyn ProgressChannel>,
    jobs: Arc<JobStore>,
    dispatcher: TaskDispatcher,
    pool: Option<Arc<InsertWorkerPool>>,
}

impl TransferService {
    /// Service with the in-process channel and the transport named by the
    /// config.
    pub fn new(config: &Config, db: Database) -> Result<Self, DtecError> {
        let channel: Arc<dyn ProgressChannel> = Arc::new(InMemoryChannel::new(
            Duration::from_secs(config.jobs.meta_ttl_secs),
            config.jobs.channel_capacity,
        ));
        Self::with_parts(config, db, channel, remote_from_config(&config.remote))
    }

    pub fn with_parts(
        config: &Config,
        db: Database,
        channel: Arc<dyn ProgressChannel>,
        remote: Arc<dyn RemoteSync>,
    ) -> Result<Self, DtecError> {
        let jobs = Arc::new(JobStore::new(Duration::from_secs(
            config.jobs.result_retention_secs,
        )));
        let inserter = EntityInserter::new(db.clone(), config.publish.chunk_size);

        let mut pool = None;
        let strategy: Arc<dyn InsertionStrategy> = match config.publish.mode {
            InsertionMode::Inline => Arc::new(InlineInsertion::new(inserter)),
            InsertionMode::Queued => {
                let workers = Arc::new(InsertWorkerPool::start(
                    Arc::new(inserter),
                    Arc::clone(&jobs),
                    config.publish.worker_count,
                    Duration::from_secs(config.publish.insert_time_limit_secs),
                )?);
                pool = Some(Arc::clone(&workers));
                Arc::new(QueuedInsertion::new(workers))
            }
        };

        let pipeline = Arc::new(TransferPipeline::from_config(
            config,
            db.clone(),
            remote,
            strategy,
        ));
        let dispatcher = TaskDispatcher::new(
            pipeline,
            Arc::clone(&channel),
            Arc::clone(&jobs),
            TaskLimits::from(&config.jobs),
        );

        Ok(Self {
            db,
            channel,
            jobs,
            dispatcher,
            pool,
        })
    }

    /// Validates the input and schedules a run. Invalid input is rejected
    /// here, before any job exists.
    pub fn trigger(
        &self,
        date: Option<&str>,
        category: Option<&str>,
    ) -> Result<TriggerResponse, DtecError> {
        let key = RunKey::from_input(date, category)?;
        self.jobs.prune();

        let task = TransferTask::new(key.clone());
        let response = TriggerResponse {
            job_id: task.job_id.clone(),
            message: "Transfer scheduled".to_string(),
            date: key.date().to_string(),
            category: key.category().map(|c| c.abbreviation().to_string()),
        };
        self.dispatcher.dispatch(task)?;

        tracing::info!(job_id = %response.job_id, key = %key, "Transfer scheduled");
        Ok(response)
    }

    /// Status of a transfer job or insertion unit.
    pub fn status(&self, job_id: &str) -> JobStatusResponse {
        self.jobs.status(job_id)
    }

    /// Live events for a run key, starting with the last snapshot.
    pub fn subscribe(&self, date: Option<&str>, category: Option<&str>) -> Result<LiveFeed, DtecError> {
        let key = RunKey::from_input(date, category)?;
        Ok(LiveFeed::open(Arc::clone(&self.channel), &key)?)
    }

    pub fn approve(&self, ids: &[i64]) -> Result<ApprovalReport, DtecError> {
        let report = record_repo::approve_many(&self.db, ids)?;
        tracing::info!(
            updated = report.updated,
            not_found = report.not_found.len(),
            "Approved records"
        );
        Ok(report)
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Blocks until every dispatched run has finished.
    pub fn wait_idle(&self) {
        self.dispatcher.wait_idle();
    }

    /// Waits for running transfers, then drains the insertion queue.
    pub fn shutdown(&self) {
        self.dispatcher.wait_idle();
        if let Some(pool) = &self.pool {
            pool.shutdown();
        }
    }
}
