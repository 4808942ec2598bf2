/// Database module: SQLite store for users, timetables, rooms and events
pub mod codes;
pub mod events;
pub mod rooms;
pub mod templates;
pub mod timetables;
pub mod types;
pub mod users;

use rusqlite::{Connection, ErrorCode, Transaction};
use std::sync::Mutex;
use tracing::info;

use crate::error::{AppError, AppResult};

const SCHEMA_SQL: &str = include_str!("../../../../sql/schema.sql");

/// Owns the single SQLite connection. Every service call runs inside one transaction.
pub struct Database {
    db: Mutex<Connection>,
}

impl Database {
    /// Opens (or creates) the database file and applies the schema.
    pub fn open(db_path: &str) -> Result<Self, rusqlite::Error> {
        info!("Opening database at {}", db_path);
        Self::init(Connection::open(db_path)?)
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Runs `f` in a transaction, committing on `Ok` and rolling back on `Err`.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> AppResult<T>) -> AppResult<T> {
        let mut db = self
            .db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))?;
        let tx = db.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Checks the connection answers a trivial query.
    pub fn health_check(&self) -> AppResult<()> {
        self.transaction(|tx| {
            tx.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }
}

/// Returns true if `err` is a UNIQUE or PRIMARY KEY constraint failure.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Maps a unique violation to `AppError::Conflict(message)`, other errors pass through.
pub(crate) fn conflict_on_duplicate(err: rusqlite::Error, message: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(message.to_string())
    } else {
        AppError::Database(err)
    }
}
