//! `SQLite`-backed store.
//!
//! Persists write-ups in a single local table with the same contract as the
//! hosted store. The connection can be switched to read-only, in which case
//! writes are reported as access-policy rejections, and a database without
//! the table reports table-not-found.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use super::{FailureKind, RemoteStore, StoreError, StoredWriteup};
use crate::error::{Error, Result};
use crate::record::{NewWriteup, Writeup, WriteupPatch};
use schema::WRITEUP_COLUMNS;

/// Local table of write-ups.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    ///
    /// Creates parent directories and the schema if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&mut conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection without touching its schema.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        }
    }

    /// Reject or allow writes on this connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be set.
    pub fn set_read_only(&self, read_only: bool) -> Result<()> {
        let pragma = if read_only {
            "PRAGMA query_only = ON"
        } else {
            "PRAGMA query_only = OFF"
        };
        self.lock().execute_batch(pragma)?;
        Ok(())
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count rows in the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count = self
            .lock()
            .query_row("SELECT COUNT(*) FROM writeups", [], |row| row.get(0))?;
        Ok(count)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn list_rows(conn: &Connection) -> rusqlite::Result<Vec<StoredWriteup>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {WRITEUP_COLUMNS} FROM writeups ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map([], row_to_stored)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn get_row(conn: &Connection, id: &str) -> rusqlite::Result<Option<StoredWriteup>> {
        conn.query_row(
            &format!("SELECT {WRITEUP_COLUMNS} FROM writeups WHERE id = ?1"),
            [id],
            row_to_stored,
        )
        .optional()
    }

    fn insert_row(conn: &Connection, record: &NewWriteup) -> rusqlite::Result<StoredWriteup> {
        let now = timestamp(Utc::now());
        conn.query_row(
            &format!(
                r"
                INSERT INTO writeups
                    (title, description, category, difficulty, platform, date,
                     tags, content, published, slug, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                RETURNING {WRITEUP_COLUMNS}
                "
            ),
            params![
                record.title,
                record.description,
                record.category,
                record.difficulty.as_str(),
                record.platform,
                record.date.to_string(),
                tags_to_json(&record.tags),
                record.content,
                record.published,
                record.slug,
                now,
            ],
            row_to_stored,
        )
    }

    fn update_row(conn: &Connection, writeup: &Writeup) -> rusqlite::Result<StoredWriteup> {
        conn.query_row(
            &format!(
                r"
                UPDATE writeups SET
                    title = ?2, description = ?3, category = ?4, difficulty = ?5,
                    platform = ?6, date = ?7, tags = ?8, content = ?9,
                    published = ?10, slug = ?11, updated_at = ?12
                WHERE id = ?1
                RETURNING {WRITEUP_COLUMNS}
                "
            ),
            params![
                writeup.id,
                writeup.title,
                writeup.description,
                writeup.category,
                writeup.difficulty.as_str(),
                writeup.platform,
                writeup.date.to_string(),
                tags_to_json(&writeup.tags),
                writeup.content,
                writeup.published,
                writeup.slug,
                timestamp(Utc::now()),
            ],
            row_to_stored,
        )
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn list(&self) -> std::result::Result<Vec<StoredWriteup>, StoreError> {
        let conn = self.lock();
        Self::list_rows(&conn).map_err(store_error)
    }

    async fn insert(&self, record: &NewWriteup) -> std::result::Result<StoredWriteup, StoreError> {
        let conn = self.lock();
        let row = Self::insert_row(&conn, record).map_err(store_error)?;
        debug!(id = %row.writeup.id, "Inserted writeup");
        Ok(row)
    }

    async fn update_partial(
        &self,
        id: &str,
        patch: &WriteupPatch,
    ) -> std::result::Result<StoredWriteup, StoreError> {
        let conn = self.lock();
        let existing = Self::get_row(&conn, id)
            .map_err(store_error)?
            .ok_or_else(|| StoreError::other(format!("no writeup with id {id}")))?;

        let merged = Writeup::from_patch(
            id,
            Some(&existing.writeup),
            patch.clone(),
            existing.writeup.date,
        );
        let row = Self::update_row(&conn, &merged).map_err(store_error)?;
        debug!(id, "Updated writeup");
        Ok(row)
    }

    async fn delete(&self, id: &str) -> std::result::Result<(), StoreError> {
        let affected = self
            .lock()
            .execute("DELETE FROM writeups WHERE id = ?1", [id])
            .map_err(store_error)?;
        debug!(id, affected, "Deleted writeup");
        Ok(())
    }
}

/// Classify a `SQLite` error for the sync layer.
fn store_error(err: rusqlite::Error) -> StoreError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(ffi, message) => match ffi.code {
            ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied
            | ErrorCode::AuthorizationForStatementDenied => FailureKind::AccessDenied,
            _ => FailureKind::classify(None, message.as_deref().unwrap_or_default()),
        },
        other => FailureKind::classify(None, &other.to_string()),
    };
    StoreError::new(kind, err.to_string())
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn tags_to_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

fn conversion_error(
    column: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, err.into())
}

/// Convert a database row to a stored write-up.
fn row_to_stored(row: &rusqlite::Row) -> rusqlite::Result<StoredWriteup> {
    let difficulty: String = row.get(4)?;
    let date: String = row.get(6)?;
    let tags: Option<String> = row.get(7)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    let parse_time = |column: usize, value: &str| {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(column, e))
    };

    let writeup = Writeup {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        category: row.get(3)?,
        difficulty: difficulty.parse().map_err(|e: String| conversion_error(4, e))?,
        platform: row.get(5)?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| conversion_error(6, e))?,
        tags: match tags {
            Some(json) => serde_json::from_str(&json).map_err(|e| conversion_error(7, e))?,
            None => Vec::new(),
        },
        content: row.get(8)?,
        published: row.get(9)?,
        slug: row.get(10)?,
    };

    Ok(StoredWriteup {
        writeup,
        created_at: parse_time(11, &created_at)?,
        updated_at: parse_time(12, &updated_at)?,
    })
}
