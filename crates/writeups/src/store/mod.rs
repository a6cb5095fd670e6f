//! Backing stores for write-ups.
//!
//! [`RemoteStore`] is the contract the sync layer talks to. Each adapter
//! turns its backend's failures into a [`StoreError`] carrying a
//! [`FailureKind`], so callers never inspect backend-specific error text.
//!
//! - [`http::HttpStore`]: a hosted PostgREST table
//! - [`sqlite::SqliteStore`]: a local `SQLite` table
//! - [`memory::MemoryStore`]: an in-process table with failure injection

pub mod http;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::record::{NewWriteup, Writeup, WriteupPatch};

pub use http::{HttpStore, HttpStoreConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Machine-readable classification of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The backing table or schema does not exist.
    TableNotFound,
    /// The caller lacks permission for the operation.
    AccessDenied,
    /// Any other failure (network, server, decoding, missing row).
    Other,
}

impl FailureKind {
    /// Classify a backend error from its code and message.
    ///
    /// Recognizes PostgREST/Postgres codes (`PGRST205`, `42P01`, `42501`)
    /// and falls back to well-known message fragments.
    #[must_use]
    pub fn classify(code: Option<&str>, message: &str) -> Self {
        match code {
            Some("PGRST205" | "42P01") => return Self::TableNotFound,
            Some("42501") => return Self::AccessDenied,
            _ => {}
        }

        let message = message.to_lowercase();
        if message.contains("could not find the table") || message.contains("no such table") {
            Self::TableNotFound
        } else if message.contains("row-level security policy")
            || message.contains("permission denied")
            || message.contains("readonly database")
        {
            Self::AccessDenied
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TableNotFound => write!(f, "table not found"),
            Self::AccessDenied => write!(f, "access denied"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A failure reported by a backing store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct StoreError {
    /// What kind of failure this is.
    pub kind: FailureKind,
    /// Human-readable detail from the backend.
    pub message: String,
}

impl StoreError {
    /// Create a new store error.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a table-not-found error.
    #[must_use]
    pub fn table_not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::TableNotFound, message)
    }

    /// Create an access-denied error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(FailureKind::AccessDenied, message)
    }

    /// Create an unclassified error.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }
}

/// A write-up as returned by a store, with server-assigned timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredWriteup {
    /// The record itself.
    pub writeup: Writeup,
    /// When the store first saved the record.
    pub created_at: DateTime<Utc>,
    /// When the store last changed the record.
    pub updated_at: DateTime<Utc>,
}

impl From<StoredWriteup> for Writeup {
    fn from(stored: StoredWriteup) -> Self {
        stored.writeup
    }
}

/// Sort rows newest first. Rows with equal timestamps keep their order.
pub fn sort_newest_first(rows: &mut [StoredWriteup]) {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Contract for a table of write-ups.
#[async_trait]
pub trait RemoteStore: Send + Sync + std::fmt::Debug {
    /// Short backend name for logging.
    fn name(&self) -> &'static str;

    /// Fetch every record, newest first.
    async fn list(&self) -> Result<Vec<StoredWriteup>, StoreError>;

    /// Insert a record and return it with its assigned id.
    async fn insert(&self, record: &NewWriteup) -> Result<StoredWriteup, StoreError>;

    /// Apply the fields present in `patch` to the record with `id`.
    async fn update_partial(
        &self,
        id: &str,
        patch: &WriteupPatch,
    ) -> Result<StoredWriteup, StoreError>;

    /// Delete the record with `id`. Deleting a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
