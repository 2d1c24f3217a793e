//! Storage error types

use thiserror::Error;

/// Result alias for table operations
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised by the storage layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// A unique index already holds the key
    #[error("duplicate key on {table}.{index}: {value}")]
    Duplicate {
        table: &'static str,
        index: &'static str,
        value: String,
    },

    #[error("record {id} not found in {table}")]
    NotFound { table: &'static str, id: String },

    #[error("update changed the primary key of a {table} record")]
    KeyChanged { table: &'static str },

    /// A writer panicked while holding the table lock
    #[error("table {table} lock poisoned")]
    Poisoned { table: &'static str },

    /// The engine could not be reached or timed out
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The engine rejected the statement or returned a row that did not decode
    #[error("storage error: {0}")]
    Backend(String),
}

impl DbError {
    /// Returns the violated index name for duplicate-key errors
    pub fn duplicate_index(&self) -> Option<&'static str> {
        match self {
            DbError::Duplicate { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Unavailable(_))
    }

    /// Map a unique-constraint failure to [`DbError::Duplicate`] on `index`;
    /// anything else converts as usual
    pub fn on_unique(
        err: sqlx::Error,
        table: &'static str,
        index: &'static str,
        value: impl FnOnce() -> String,
    ) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Duplicate {
                table,
                index,
                value: value(),
            },
            _ => err.into(),
        }
    }
}

/// SQLITE_BUSY and SQLITE_LOCKED, including their extended codes
fn is_busy(err: &dyn sqlx::error::DatabaseError) -> bool {
    err.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DbError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(db_err) if is_busy(db_err.as_ref()) => {
                DbError::Unavailable(err.to_string())
            }
            _ => DbError::Backend(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Backend(format!("migration failed: {}", err))
    }
}
