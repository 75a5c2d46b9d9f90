//! Durable store error types.

use std::time::Duration;
use thiserror::Error;

/// Durable store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query-level database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// The store cannot be reached at all
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Operation exceeded its deadline
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Row targeted by an update does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Insert collided with a unique key
    #[error("Record already exists: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Whether the whole store, rather than one operation, is failing
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(StoreError::from(sqlx::Error::PoolClosed).is_unavailable());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_unavailable());
    }

    #[test]
    fn test_timeout_display() {
        let err = StoreError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("5s"));
    }
}
