//! Events streamed to live observers of a transfer run.

use serde::Serialize;

use crate::pipeline::summary::RunSummary;
use crate::request::RunKey;

/// Stage a run is in, reported as the `state` field.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    Start,
    Transferring,
    Inserting,
    Summary,
    Done,
    Failed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunPhase::Start => "START",
            RunPhase::Transferring => "TRANSFERRING",
            RunPhase::Inserting => "INSERTING",
            RunPhase::Summary => "SUMMARY",
            RunPhase::Done => "DONE",
            RunPhase::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Identity fields carried by every event.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobRef {
    pub task_id: String,
    pub key: String,
    pub date: String,
    pub category: Option<String>,
}

impl JobRef {
    pub fn new(task_id: &str, key: &RunKey) -> Self {
        Self {
            task_id: task_id.to_string(),
            key: key.job_key(),
            date: key.date().to_string(),
            category: key.category().map(|c| c.abbreviation().to_string()),
        }
    }
}

/// Per-step context. Only the fields relevant to a step are set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StepDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted_for_news: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferEvent {
    Started {
        #[serde(flatten)]
        job: JobRef,
        progress: u8,
        state: RunPhase,
    },
    Progress {
        #[serde(flatten)]
        job: JobRef,
        progress: u8,
        state: RunPhase,
        step: usize,
        total: usize,
        #[serde(flatten)]
        detail: StepDetail,
    },
    Done {
        #[serde(flatten)]
        job: JobRef,
        progress: u8,
        state: RunPhase,
        result: RunSummary,
    },
    Failed {
        #[serde(flatten)]
        job: JobRef,
        progress: u8,
        state: RunPhase,
        error: String,
    },
}

impl TransferEvent {
    pub fn started(job: JobRef) -> Self {
        TransferEvent::Started {
            job,
            progress: 0,
            state: RunPhase::Start,
        }
    }

    pub fn progress(
        job: JobRef,
        step: usize,
        total: usize,
        state: RunPhase,
        detail: StepDetail,
    ) -> Self {
        TransferEvent::Progress {
            job,
            progress: percent(step, total),
            state,
            step,
            total,
            detail,
        }
    }

    pub fn done(job: JobRef, result: RunSummary) -> Self {
        TransferEvent::Done {
            job,
            progress: 100,
            state: RunPhase::Done,
            result,
        }
    }

    pub fn failed(job: JobRef, error: impl Into<String>) -> Self {
        TransferEvent::Failed {
            job,
            progress: 0,
            state: RunPhase::Failed,
            error: error.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferEvent::Done { .. } | TransferEvent::Failed { .. })
    }
}

/// Integer percentage of `step` over `total`; 0 when `total` is 0.
pub fn percent(step: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (step.min(total) * 100 / total) as u8
}
