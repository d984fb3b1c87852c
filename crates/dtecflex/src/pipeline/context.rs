use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::PipelineError;

/// Per-run execution limits.
#[derive(Debug, Clone)]
pub struct RunContext {
    task_id: String,
    soft_limit: Option<Duration>,
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            soft_limit: None,
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the soft-limit clock now.
    pub fn with_soft_limit(mut self, limit: Duration) -> Self {
        self.soft_limit = Some(limit);
        self.deadline = Some(Instant::now() + limit);
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails once the run was cancelled or its soft limit passed.
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        match (self.deadline, self.soft_limit) {
            (Some(deadline), Some(limit)) if Instant::now() >= deadline => {
                Err(PipelineError::TimeLimitExceeded {
                    limit_secs: limit.as_secs(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_context_passes() {
        let ctx = RunContext::new("t");
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_expired_soft_limit() {
        let ctx = RunContext::new("t").with_soft_limit(Duration::ZERO);
        assert!(matches!(
            ctx.check(),
            Err(PipelineError::TimeLimitExceeded { limit_secs: 0 })
        ));
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let ctx = RunContext::new("t");
        let other = ctx.clone();
        other.cancel();
        assert!(matches!(ctx.check(), Err(PipelineError::Cancelled)));
    }
}
