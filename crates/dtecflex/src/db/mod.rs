//! SQLite store for scraped records, their named entities and the
//! published `Auxiliar` rows.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

pub mod aux_repo;
pub mod entity_repo;
pub mod error;
pub mod record_repo;
mod schema;

pub use error::DatabaseError;

/// Shared handle to one connection.
///
/// Clones share the connection. Transactions live inside a single
/// `with_conn_mut` call, so the mutex is never held across records.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the file at `path`, creating parent directories, and brings the
    /// schema up to date.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DatabaseError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let db = Self::prepare(Connection::open(path)?, Some("PRAGMA journal_mode=WAL;"))?;
        log::info!("Record store ready at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?, None)
    }

    fn prepare(conn: Connection, pragmas: Option<&str>) -> Result<Self, DatabaseError> {
        if let Some(pragmas) = pragmas {
            conn.execute_batch(pragmas)?;
        }
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::apply(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    /// Mutable access, needed to open a transaction.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut Connection) -> Result<T, DatabaseError>,
    {
        let mut conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&mut conn)
    }
}

/// Wall-clock timestamp in the format stored by the `DT_*` columns.
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
