//! Worker pool for queued insertion units.

pub mod job;
pub mod pool;

pub use job::InsertTask;
pub use pool::InsertWorkerPool;
