//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A schema step could not be applied.
    #[error("Schema step {step} failed: {reason}")]
    Schema { step: u32, reason: String },

    /// A unique key already exists.
    #[error("Duplicate {what}: {value}")]
    Duplicate { what: &'static str, value: String },

    /// The row to change does not exist.
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: i64 },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl DatabaseError {
    /// True for constraint violations (NOT NULL, CHECK, UNIQUE, FK).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
