pub mod broadcast;
pub mod category;
pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod lifecycle;
pub mod logging;
pub mod pipeline;
pub mod publish;
pub mod request;
pub mod sanitize;
pub mod selector;
pub mod service;
pub mod task;
pub mod transfer;
pub mod worker;

pub use broadcast::{InMemoryChannel, JobState, JobStore, LiveFeed, ProgressChannel, TransferEvent};
pub use category::Category;
pub use config::{load_config, Config};
pub use db::Database;
pub use error::{DtecError, Result};
pub use extraction::{extract_and_store, parse_extraction_response, EntityExtractor};
pub use pipeline::{RunContext, RunSummary, TransferPipeline};
pub use request::{RunDate, RunKey};
pub use selector::{RecordSelector, Selection};
pub use service::{TransferService, TriggerResponse};
pub use task::{TaskDispatcher, TransferTask};
pub use transfer::{FileTransferExecutor, LocalMirror, RemoteSync, RsyncRemote};
