use thiserror::Error;

/// Errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    /// A concurrent writer got there first (unique violation, serialization
    /// failure, deadlock). Safe for the caller to retry.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Transaction acquisition, lock wait or statement exceeded its bound.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// A write would break a storage-level invariant (negative counter,
    /// dangling reference).
    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_) | StoreError::Timeout(_))
    }
}

// SQLSTATE codes we classify instead of passing through.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const QUERY_CANCELED: &str = "57014";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => {
                StoreError::Timeout("Timed out acquiring a database connection".to_string())
            }
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) | Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                    StoreError::Conflict(db.message().to_string())
                }
                Some(LOCK_NOT_AVAILABLE) | Some(QUERY_CANCELED) => {
                    StoreError::Timeout(db.message().to_string())
                }
                Some(CHECK_VIOLATION) | Some(FOREIGN_KEY_VIOLATION) => {
                    StoreError::Integrity(db.message().to_string())
                }
                _ => StoreError::Sqlx(err),
            },
            _ => StoreError::Sqlx(err),
        }
    }
}
