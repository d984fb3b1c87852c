use std::sync::{Arc, Mutex, MutexGuard};

use crate::broadcast::{emit, JobRef, JobStore, ProgressChannel, RunPhase, StepDetail, TransferEvent};
use crate::request::RunKey;

/// One reported step of a run.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub step: usize,
    pub total: usize,
    pub phase: RunPhase,
    pub detail: StepDetail,
}

impl ProgressUpdate {
    pub fn new(step: usize, total: usize, phase: RunPhase, detail: StepDetail) -> Self {
        Self {
            step,
            total,
            phase,
            detail,
        }
    }

    pub fn percent(&self) -> u8 {
        crate::broadcast::percent(self.step, self.total)
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

/// Saves, broadcasts and records each step for a dispatched run.
///
/// Once closed, further reports are dropped so a run that outlived its
/// hard limit cannot overwrite the terminal event. A report holds the
/// `closed` lock until its event is out, so `close` waits for it.
pub struct ChannelProgress {
    channel: Arc<dyn ProgressChannel>,
    jobs: Arc<JobStore>,
    key: RunKey,
    job: JobRef,
    closed: Mutex<bool>,
}

impl ChannelProgress {
    pub fn new(
        channel: Arc<dyn ProgressChannel>,
        jobs: Arc<JobStore>,
        key: RunKey,
        job: JobRef,
    ) -> Self {
        Self {
            channel,
            jobs,
            key,
            job,
            closed: Mutex::new(false),
        }
    }

    pub fn close(&self) {
        *self.closed_flag() = true;
    }

    fn closed_flag(&self) -> MutexGuard<'_, bool> {
        self.closed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressReporter for ChannelProgress {
    fn report(&self, update: ProgressUpdate) {
        let closed = self.closed_flag();
        if *closed {
            return;
        }
        self.jobs
            .update_progress(&self.job.task_id, update.step, update.total, update.phase);
        let event = TransferEvent::progress(
            self.job.clone(),
            update.step,
            update.total,
            update.phase,
            update.detail,
        );
        if let Err(e) = emit(self.channel.as_ref(), &self.key, &event) {
            tracing::warn!(key = %self.key, error = %e, "Failed to publish progress");
        }
        drop(closed);
    }
}
