use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use uuid::Uuid;

use crate::broadcast::{emit, JobKind, JobRef, JobState, JobStore, ProgressChannel, TransferEvent};
use crate::config::JobsConfig;
use crate::pipeline::{ChannelProgress, RunContext, RunSummary, TransferPipeline};
use crate::request::RunKey;

use super::error::TaskError;
use super::guard::RunLockGuard;

/// A queued transfer run.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub job_id: String,
    pub key: RunKey,
}

impl TransferTask {
    pub fn new(key: RunKey) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            key,
        }
    }
}

/// Time bounds applied to every dispatched run.
#[derive(Debug, Clone, Copy)]
pub struct TaskLimits {
    pub lock_ttl: Duration,
    pub soft_limit: Duration,
    pub hard_limit: Duration,
}

impl From<&JobsConfig> for TaskLimits {
    fn from(config: &JobsConfig) -> Self {
        Self {
            lock_ttl: Duration::from_secs(config.lock_ttl_secs),
            soft_limit: Duration::from_secs(config.soft_time_limit_secs),
            hard_limit: Duration::from_secs(config.hard_time_limit_secs),
        }
    }
}

/// Runs each transfer task on its own supervised thread.
///
/// The supervisor owns the terminal event: whatever the run thread does
/// (return, fail, panic, hang past the hard limit) the job ends in exactly
/// one `DONE` or `FAILED`. The run lock is shared with the run thread and is
/// only released once that thread can no longer touch the key.
pub struct TaskDispatcher {
    pipeline: Arc<TransferPipeline>,
    channel: Arc<dyn ProgressChannel>,
    jobs: Arc<JobStore>,
    limits: TaskLimits,
    supervisors: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskDispatcher {
    pub fn new(
        pipeline: Arc<TransferPipeline>,
        channel: Arc<dyn ProgressChannel>,
        jobs: Arc<JobStore>,
        limits: TaskLimits,
    ) -> Self {
        Self {
            pipeline,
            channel,
            jobs,
            limits,
            supervisors: Mutex::new(Vec::new()),
        }
    }

    /// Registers the task as pending and returns without waiting for it.
    pub fn dispatch(&self, task: TransferTask) -> Result<(), TaskError> {
        self.jobs
            .register(&task.job_id, JobKind::Transfer, &task.key.job_key());

        let supervisor = Supervisor {
            pipeline: Arc::clone(&self.pipeline),
            channel: Arc::clone(&self.channel),
            jobs: Arc::clone(&self.jobs),
            limits: self.limits,
        };
        let job_id = task.job_id.clone();
        let spawned = thread::Builder::new()
            .name(format!("transfer-{}", task.key))
            .spawn(move || supervisor.run(task));

        match spawned {
            Ok(handle) => {
                let mut supervisors = match self.supervisors.lock() {
                    Ok(g) => g,
                    Err(poisoned) => poisoned.into_inner(),
                };
                supervisors.retain(|h| !h.is_finished());
                supervisors.push(handle);
                Ok(())
            }
            Err(e) => {
                let err = TaskError::Spawn(e.to_string());
                self.jobs
                    .finish(&job_id, JobState::Failure, None, Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Joins every supervisor dispatched so far.
    pub fn wait_idle(&self) {
        let handles = match self.supervisors.lock() {
            Ok(mut g) => std::mem::take(&mut *g),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Transfer supervisor panicked");
            }
        }
    }
}

struct Supervisor {
    pipeline: Arc<TransferPipeline>,
    channel: Arc<dyn ProgressChannel>,
    jobs: Arc<JobStore>,
    limits: TaskLimits,
}

impl Supervisor {
    fn run(self, task: TransferTask) {
        let lock_name = task.key.lock_name();
        match self.channel.acquire_lock(&lock_name, self.limits.lock_ttl) {
            Ok(true) => {}
            Ok(false) => {
                let err = TaskError::RunInProgress {
                    key: task.key.job_key(),
                };
                tracing::warn!(task_id = %task.job_id, error = %err, "Run rejected");
                self.jobs
                    .finish(&task.job_id, JobState::Failure, None, Some(err.to_string()));
                return;
            }
            Err(e) => {
                let err = TaskError::Channel(e);
                tracing::error!(task_id = %task.job_id, error = %err, "Could not acquire run lock");
                self.jobs
                    .finish(&task.job_id, JobState::Failure, None, Some(err.to_string()));
                return;
            }
        }
        let guard = Arc::new(RunLockGuard::new(Arc::clone(&self.channel), lock_name));

        let job = JobRef::new(&task.job_id, &task.key);
        self.jobs.mark_started(&task.job_id);
        self.publish(&task.key, &TransferEvent::started(job.clone()));

        let reporter = Arc::new(ChannelProgress::new(
            Arc::clone(&self.channel),
            Arc::clone(&self.jobs),
            task.key.clone(),
            job.clone(),
        ));
        let ctx = RunContext::new(task.job_id.clone()).with_soft_limit(self.limits.soft_limit);

        let outcome = self.execute(&task, Arc::clone(&reporter), ctx.clone(), Arc::clone(&guard));
        let abandoned = matches!(outcome, Err(TaskError::HardTimeLimit { .. }));
        if abandoned {
            ctx.cancel();
        }
        reporter.close();

        let (status, result, error) = match outcome {
            Ok(summary) => {
                tracing::info!(task_id = %task.job_id, key = %task.key, "Transfer run succeeded");
                let result = serde_json::to_value(&summary).ok();
                self.publish(&task.key, &TransferEvent::done(job, summary));
                (JobState::Success, result, None)
            }
            Err(err) => {
                tracing::error!(task_id = %task.job_id, key = %task.key, error = %err, "Transfer run failed");
                self.publish(&task.key, &TransferEvent::failed(job, err.to_string()));
                (JobState::Failure, None, Some(err.to_string()))
            }
        };

        if abandoned {
            tracing::warn!(task_id = %task.job_id, key = %task.key, "Run lock kept until the abandoned run exits");
        } else {
            guard.release();
        }
        self.jobs.finish(&task.job_id, status, result, error);
    }

    /// Runs the pipeline on a separate thread and waits up to the hard limit.
    fn execute(
        &self,
        task: &TransferTask,
        reporter: Arc<ChannelProgress>,
        ctx: RunContext,
        lock: Arc<RunLockGuard>,
    ) -> Result<RunSummary, TaskError> {
        let (tx, rx) = bounded(1);
        let pipeline = Arc::clone(&self.pipeline);
        let key = task.key.clone();

        thread::Builder::new()
            .name(format!("transfer-run-{}", task.key))
            .spawn(move || {
                let _lock = lock;
                let category = key.category().map(|c| c.abbreviation());
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    pipeline.run(key.date(), category, reporter.as_ref(), &ctx)
                }));
                let _ = tx.send(result);
            })
            .map_err(|e| TaskError::Spawn(e.to_string()))?;

        match rx.recv_timeout(self.limits.hard_limit) {
            Ok(Ok(result)) => result.map_err(TaskError::from),
            Ok(Err(payload)) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
            Err(RecvTimeoutError::Timeout) => Err(TaskError::HardTimeLimit {
                limit_secs: self.limits.hard_limit.as_secs(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(TaskError::Panicked(
                "run thread exited without a result".to_string(),
            )),
        }
    }

    fn publish(&self, key: &RunKey, event: &TransferEvent) {
        if let Err(e) = emit(self.channel.as_ref(), key, event) {
            tracing::warn!(key = %key, error = %e, "Failed to publish run event");
        }
        if event.is_terminal() {
            if let Err(e) = self.channel.release_topic(&key.channel_name()) {
                tracing::warn!(key = %key, error = %e, "Failed to release run topic");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
