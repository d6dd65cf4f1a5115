pub mod error;
pub mod models;
pub mod queries;
pub mod record;
pub mod schema;

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

pub use error::StoreError;

/// How long a caller waits for the sqlite-level lock before the
/// operation fails instead of blocking forever.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// The single embedded store. One connection, one writer at a time;
/// every access goes through [`Database::exclusive`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside an exclusive transaction. Commits when `f` returns
    /// `Ok`; the transaction rolls back on drop otherwise, so every exit
    /// path releases the store. Concurrent scopes serialize on the
    /// connection mutex. The error type is anything a [`StoreError`]
    /// converts into, so callers can fail a scope with their own errors.
    pub fn exclusive<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| E::from(StoreError::LockPoisoned))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)
            .map_err(|e| E::from(StoreError::from(e)))?;
        let value = f(&tx)?;
        tx.commit().map_err(|e| E::from(StoreError::from(e)))?;
        Ok(value)
    }
}
