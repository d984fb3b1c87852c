//! In-memory status store for transfer tasks and queued insertion units.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::events::RunPhase;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Started,
    Success,
    Failure,
    Retry,
}

impl JobState {
    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Transfer,
    Insert,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredJob {
    pub job_id: String,
    pub kind: JobKind,
    pub status: JobState,
    /// Run key for transfers, `record:{id}` for insertion units.
    pub key: String,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<RunPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Answer to a status query.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct JobStore {
    jobs: RwLock<HashMap<String, StoredJob>>,
    retention: Duration,
}

impl JobStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredJob>> {
        match self.jobs.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredJob>> {
        match self.jobs.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn register(&self, job_id: &str, kind: JobKind, key: &str) {
        self.prune();
        self.write().insert(
            job_id.to_string(),
            StoredJob {
                job_id: job_id.to_string(),
                kind,
                status: JobState::Pending,
                key: key.to_string(),
                progress: 0,
                phase: None,
                step: None,
                total: None,
                submitted_at: Utc::now(),
                finished_at: None,
                result: None,
                error: None,
            },
        );
    }

    pub fn mark_started(&self, job_id: &str) {
        if let Some(job) = self.write().get_mut(job_id) {
            if !job.status.is_finished() {
                job.status = JobState::Started;
            }
        }
    }

    pub fn update_progress(&self, job_id: &str, step: usize, total: usize, phase: RunPhase) {
        if let Some(job) = self.write().get_mut(job_id) {
            if job.status.is_finished() {
                return;
            }
            job.status = JobState::Started;
            job.step = Some(step);
            job.total = Some(total);
            job.phase = Some(phase);
            job.progress = super::events::percent(step, total);
        }
    }

    /// Records the terminal state. Only the first call for a job takes
    /// effect; returns whether this call did.
    pub fn finish(
        &self,
        job_id: &str,
        status: JobState,
        result: Option<Value>,
        error: Option<String>,
    ) -> bool {
        let mut jobs = self.write();
        match jobs.get_mut(job_id) {
            Some(job) if !job.status.is_finished() => {
                job.status = status;
                job.finished_at = Some(Utc::now());
                if status == JobState::Success {
                    job.progress = 100;
                }
                job.result = result;
                job.error = error;
                true
            }
            Some(_) => false,
            None => {
                log::warn!("finish() for unknown job {}", job_id);
                false
            }
        }
    }

    pub fn get(&self, job_id: &str) -> Option<StoredJob> {
        self.prune();
        self.read().get(job_id).cloned()
    }

    /// Status of any job; unknown or expired ids read as pending.
    pub fn status(&self, job_id: &str) -> JobStatusResponse {
        match self.get(job_id) {
            Some(job) => JobStatusResponse {
                job_id: job.job_id,
                status: job.status,
                progress: Some(job.progress),
                result: job.result,
                error: job.error,
            },
            None => JobStatusResponse {
                job_id: job_id.to_string(),
                status: JobState::Pending,
                progress: None,
                result: None,
                error: None,
            },
        }
    }

    /// Drops finished jobs older than the retention window.
    pub fn prune(&self) {
        let retention = match chrono::Duration::from_std(self.retention) {
            Ok(r) => r,
            Err(_) => return,
        };
        let now = Utc::now();
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, job| match job.finished_at {
            Some(at) => now - at < retention,
            None => true,
        });
        let removed = before - jobs.len();
        if removed > 0 {
            log::debug!("Pruned {} expired job(s)", removed);
        }
    }

    /// Polls until the job finishes or `timeout` elapses.
    pub fn wait_for(&self, job_id: &str, timeout: Duration) -> Option<StoredJob> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(job) = self.read().get(job_id) {
                if job.status.is_finished() {
                    return Some(job.clone());
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
