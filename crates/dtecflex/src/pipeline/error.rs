use thiserror::Error;

use crate::error::ValidationError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Record selection failed: {0}")]
    SelectionFailed(String),

    #[error("Soft time limit of {limit_secs}s exceeded")]
    TimeLimitExceeded { limit_secs: u64 },

    #[error("Run cancelled")]
    Cancelled,
}
