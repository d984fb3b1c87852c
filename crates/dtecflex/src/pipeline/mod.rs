pub mod context;
pub mod error;
pub mod progress;
pub mod runner;
pub mod strategy;
pub mod summary;

pub use context::RunContext;
pub use error::PipelineError;
pub use progress::{ChannelProgress, NoopProgress, ProgressReporter, ProgressUpdate};
pub use runner::TransferPipeline;
pub use strategy::{InlineInsertion, InsertionResult, InsertionStrategy, QueuedInsertion};
pub use summary::{DispatchedUnit, FailedRecord, InsertionSummary, RunSummary};
