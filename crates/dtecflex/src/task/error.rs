use thiserror::Error;

use crate::error::ChannelError;
use crate::pipeline::PipelineError;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("A run is already in progress for {key}")]
    RunInProgress { key: String },

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Hard time limit of {limit_secs}s exceeded")]
    HardTimeLimit { limit_secs: u64 },

    #[error("Run panicked: {0}")]
    Panicked(String),

    #[error("Failed to spawn run thread: {0}")]
    Spawn(String),
}
