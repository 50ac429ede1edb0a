//! Storage-specific error types for SQLite operations.
//!
//! Diesel and r2d2 errors are wrapped in [`StorageError`] inside this crate
//! and converted to the engine's `CacheError` / `AuditError` at the trait
//! boundary.

use diesel::result::Error as DieselError;
use territory_core::audit::AuditError;
use territory_core::cache::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Writer actor unavailable: {0}")]
    WriterUnavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// True when the database could not be reached at all, as opposed to a
    /// failed statement.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::PoolError(_) | Self::WriterUnavailable(_)
        )
    }
}

impl From<chrono::ParseError> for StorageError {
    fn from(err: chrono::ParseError) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl From<StorageError> for CacheError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SerializationError(e) => CacheError::Serialization(e),
            e if e.is_unavailable() => CacheError::Unavailable(e.to_string()),
            e => CacheError::Backend(e.to_string()),
        }
    }
}

impl From<StorageError> for AuditError {
    fn from(err: StorageError) -> Self {
        if err.is_unavailable() {
            AuditError::Unavailable(err.to_string())
        } else {
            AuditError::Storage(err.to_string())
        }
    }
}
