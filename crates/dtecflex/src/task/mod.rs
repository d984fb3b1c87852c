//! Background execution of transfer runs.

pub mod dispatcher;
pub mod error;
pub mod guard;

pub use dispatcher::{TaskDispatcher, TaskLimits, TransferTask};
pub use error::TaskError;
pub use guard::RunLockGuard;
