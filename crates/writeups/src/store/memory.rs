//! In-process store.
//!
//! Keeps rows in a `Vec` behind a mutex. Failures can be scripted with
//! [`MemoryStore::fail_next`] and [`MemoryStore::fail_always`] to exercise
//! the sync layer's fallback paths.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::trace;

use super::{sort_newest_first, RemoteStore, StoreError, StoredWriteup};
use crate::record::{NewWriteup, Writeup, WriteupPatch};

/// An in-memory table of write-ups.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<StoredWriteup>,
    /// Logical clock; each write advances it by one second.
    tick: i64,
    next_id: u64,
    queued_failures: VecDeque<StoreError>,
    permanent_failure: Option<StoreError>,
    calls: usize,
}

impl Inner {
    fn now(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        DateTime::from_timestamp(self.tick, 0).unwrap_or_default()
    }

    /// Count the call and return any scripted failure for it.
    fn begin_call(&mut self) -> Result<(), StoreError> {
        self.calls += 1;
        if let Some(err) = self.queued_failures.pop_front() {
            return Err(err);
        }
        match &self.permanent_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `writeups`, treating the first as newest.
    #[must_use]
    pub fn with_writeups(writeups: Vec<Writeup>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for writeup in writeups.into_iter().rev() {
                let now = inner.now();
                inner.rows.push(StoredWriteup {
                    writeup,
                    created_at: now,
                    updated_at: now,
                });
            }
            sort_newest_first(&mut inner.rows);
        }
        store
    }

    /// Fail the next call with `err`. Queued failures are used in order.
    pub fn fail_next(&self, err: StoreError) {
        self.lock().queued_failures.push_back(err);
    }

    /// Fail every call with `err` until [`MemoryStore::clear_failures`].
    pub fn fail_always(&self, err: StoreError) {
        self.lock().permanent_failure = Some(err);
    }

    /// Drop all scripted failures.
    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.queued_failures.clear();
        inner.permanent_failure = None;
    }

    /// Number of calls made against this store, including failed ones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    /// Number of rows held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    /// Check if the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<StoredWriteup>, StoreError> {
        let mut inner = self.lock();
        inner.begin_call()?;
        let mut rows = inner.rows.clone();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    async fn insert(&self, record: &NewWriteup) -> Result<StoredWriteup, StoreError> {
        let mut inner = self.lock();
        inner.begin_call()?;

        inner.next_id += 1;
        let id = format!("mem-{}", inner.next_id);
        let now = inner.now();
        let row = StoredWriteup {
            writeup: record.clone().into_writeup(id),
            created_at: now,
            updated_at: now,
        };
        trace!(id = %row.writeup.id, "memory insert");
        inner.rows.insert(0, row.clone());
        Ok(row)
    }

    async fn update_partial(
        &self,
        id: &str,
        patch: &WriteupPatch,
    ) -> Result<StoredWriteup, StoreError> {
        let mut inner = self.lock();
        inner.begin_call()?;

        let now = inner.now();
        let row = inner
            .rows
            .iter_mut()
            .find(|r| r.writeup.id == id)
            .ok_or_else(|| StoreError::other(format!("no writeup with id {id}")))?;

        row.writeup = Writeup::from_patch(id, Some(&row.writeup), patch.clone(), row.writeup.date);
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.begin_call()?;
        inner.rows.retain(|r| r.writeup.id != id);
        Ok(())
    }
}
