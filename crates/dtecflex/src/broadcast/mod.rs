pub mod channel;
pub mod events;
pub mod job_store;
pub mod live;
pub mod memory;

pub use channel::{emit, ProgressChannel};
pub use events::{percent, JobRef, RunPhase, StepDetail, TransferEvent};
pub use job_store::{JobKind, JobState, JobStatusResponse, JobStore, StoredJob};
pub use live::LiveFeed;
pub use memory::InMemoryChannel;
