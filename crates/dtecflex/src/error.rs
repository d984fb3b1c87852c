use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DtecError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Task error: {0}")]
    Task(#[from] crate::task::TaskError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid value '{value}' in environment variable {name}")]
    InvalidEnv { name: String, value: String },
}

/// Input rejected before any side effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid category: '{0}'")]
    InvalidCategory(String),

    #[error("Invalid date '{0}': expected YYYYMMDD")]
    InvalidDate(String),
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("No local files match '{pattern}'")]
    NoLocalFiles { pattern: String },

    #[error("Record {record_id} has an unknown category")]
    UnknownCategory { record_id: i64 },

    #[error("Record {record_id} has no registration identifier")]
    MissingRegistration { record_id: i64 },

    #[error("Invalid file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Failed to create remote directory '{dir}': {reason}")]
    CreateRemoteDir { dir: String, reason: String },

    #[error("Failed to copy files to '{dir}': {reason}")]
    Copy { dir: String, reason: String },

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),

    #[error("Record {0} not found")]
    RecordNotFound(i64),

    #[error("Record {record_id} has an unknown category")]
    UnknownCategory { record_id: i64 },
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),

    #[error("Record {0} not found")]
    RecordNotFound(i64),

    #[error("Extraction service failed: {0}")]
    Service(String),
}

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Channel state lock poisoned")]
    LockPoisoned,

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Insertion queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },
}

pub type Result<T> = std::result::Result<T, DtecError>;
