//! Connection management and shared store client.

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::schema;

/// Errors from store operations.
///
/// "Never seen" is not an error: lookups return `Ok(None)` for unknown
/// addresses and reserve `Err` for real store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Shared scan-history store client.
///
/// This is the single point of access for all persistence operations.
/// Clone is cheap (inner Arc); the connection is serialized behind an
/// async mutex so the pipeline can query it per host without blocking
/// the runtime's worker threads on lock contention.
#[derive(Clone)]
pub struct HistoryStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl HistoryStore {
    /// Open (or create) the history database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        schema::init(&conn)?;

        tracing::info!(path = %path.as_ref().display(), "Opened history store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// An in-memory store, used by tests and ephemeral runs.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}
