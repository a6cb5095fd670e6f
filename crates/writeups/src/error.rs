//! Error types for writeups.
//!
//! This module defines all error types used throughout the writeups crate.
//! Failures reported by a backing store are carried separately as
//! [`StoreError`] so the sync layer can match on their [`FailureKind`].

use std::path::PathBuf;
use thiserror::Error;

use crate::store::{FailureKind, StoreError};

/// The main error type for writeups operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The backing store rejected or failed an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Record Errors ===
    /// A record is missing a required field.
    #[error("invalid writeup: {field} is required")]
    InvalidRecord {
        /// Name of the missing field.
        field: &'static str,
    },

    /// No record matched the given id or slug.
    #[error("writeup not found: {0}")]
    NotFound(String),

    /// The session was closed while an operation was in flight.
    #[error("session closed")]
    SessionClosed,

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for writeups operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new not-found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The failure kind, if this error came from a backing store.
    #[must_use]
    pub fn store_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Store(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Check if this error is an access-policy rejection.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        self.store_kind() == Some(FailureKind::AccessDenied)
    }

    /// Check if this error indicates a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::SessionClosed;
        assert_eq!(err.to_string(), "session closed");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_invalid_record_display() {
        let err = Error::InvalidRecord { field: "title" };
        assert_eq!(err.to_string(), "invalid writeup: title is required");
    }

    #[test]
    fn test_not_found() {
        let err = Error::not_found("evil-gpt-v2");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("evil-gpt-v2"));
        assert!(!Error::SessionClosed.is_not_found());
    }

    #[test]
    fn test_store_error_kind() {
        let err: Error = StoreError::new(FailureKind::AccessDenied, "denied").into();
        assert!(err.is_access_denied());
        assert_eq!(err.store_kind(), Some(FailureKind::AccessDenied));

        let err: Error = StoreError::new(FailureKind::Other, "boom").into();
        assert!(!err.is_access_denied());
        assert!(err.to_string().contains("boom"));

        assert_eq!(Error::SessionClosed.store_kind(), None);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "store.url is required".to_string(),
        };
        assert!(err.to_string().contains("store.url"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
