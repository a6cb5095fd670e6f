//! Synchronization layer.
//!
//! [`SyncLayer`] owns the session's collection of write-ups and keeps one
//! read/write surface over it whether or not the backing store is usable.
//!
//! The layer starts in [`Mode::Remote`]. A missing table or an access-policy
//! rejection moves it to [`Mode::Fallback`], where every operation works on
//! the in-memory collection only. Fallback is sticky: nothing moves the layer
//! back to remote for the lifetime of the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDate, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::fixtures::fixture_writeups;
use crate::record::{NewWriteup, Writeup, WriteupPatch};
use crate::store::{sort_newest_first, FailureKind, RemoteStore, StoreError};

/// Which side the session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Operations go to the backing store first.
    #[default]
    Remote,
    /// Operations touch the session collection only.
    Fallback,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Why the session entered [`Mode::Fallback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The backing table does not exist.
    TableMissing,
    /// The store rejected the caller.
    AccessDenied,
    /// The initial load failed for another reason.
    LoadFailure(String),
    /// The session was configured to start in fallback.
    Configured,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TableMissing => write!(f, "table not found"),
            Self::AccessDenied => write!(f, "access denied"),
            Self::LoadFailure(message) => write!(f, "load failed: {message}"),
            Self::Configured => write!(f, "configured"),
        }
    }
}

/// A read-only view of the session at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// The session collection, newest first.
    pub writeups: Arc<[Writeup]>,
    /// Current mode.
    pub mode: Mode,
    /// Why the session is in fallback, if it is.
    pub reason: Option<FallbackReason>,
    /// Whether a load has completed.
    pub loaded: bool,
}

impl Snapshot {
    /// Check if the session is serving local data only.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.mode == Mode::Fallback
    }
}

/// Handle to a session's write-ups. Clones share the same session.
#[derive(Debug, Clone)]
pub struct SyncLayer {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    store: Arc<dyn RemoteStore>,
    config: SyncConfig,
    state: Mutex<State>,
    snapshots: watch::Sender<Snapshot>,
    live: AtomicBool,
}

#[derive(Debug, Default)]
struct State {
    mode: Mode,
    reason: Option<FallbackReason>,
    writeups: Vec<Writeup>,
    loaded: bool,
    last_local_id: i64,
}

impl State {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            writeups: self.writeups.clone().into(),
            mode: self.mode,
            reason: self.reason.clone(),
            loaded: self.loaded,
        }
    }

    fn enter_fallback(&mut self, reason: FallbackReason) {
        if self.mode == Mode::Fallback {
            return;
        }
        warn!(%reason, "Switching to local fallback data");
        self.mode = Mode::Fallback;
        self.reason = Some(reason);
    }

    fn seed_fixtures(&mut self) {
        self.writeups = fixture_writeups();
        self.loaded = true;
    }

    /// Next locally synthesized id: the current time in milliseconds,
    /// bumped past the previous one when two land in the same millisecond.
    fn next_local_id(&mut self) -> String {
        let id = Utc::now().timestamp_millis().max(self.last_local_id + 1);
        self.last_local_id = id;
        id.to_string()
    }

    fn create_local(&mut self, record: NewWriteup) -> Writeup {
        let id = self.next_local_id();
        let writeup = record.into_writeup(id);
        self.writeups.insert(0, writeup.clone());
        writeup
    }

    fn update_local(&mut self, id: &str, patch: WriteupPatch) -> Writeup {
        let position = self.writeups.iter().position(|w| w.id == id);
        let base = position.map(|i| &self.writeups[i]);
        let writeup = Writeup::from_patch(id, base, patch, today());
        if let Some(i) = position {
            self.writeups[i] = writeup.clone();
        }
        writeup
    }

    fn replace(&mut self, writeup: &Writeup) {
        if let Some(existing) = self.writeups.iter_mut().find(|w| w.id == writeup.id) {
            existing.clone_from(writeup);
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        let before = self.writeups.len();
        self.writeups.retain(|w| w.id != id);
        self.writeups.len() != before
    }
}

/// Today's date in local time.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl SyncLayer {
    /// Create a session over `store`. Nothing is fetched until [`SyncLayer::load`].
    #[must_use]
    pub fn new(store: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        let mut state = State::default();
        if config.start_in_fallback {
            state.enter_fallback(FallbackReason::Configured);
        }
        let (snapshots, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(Inner {
                store,
                config,
                state: Mutex::new(state),
                snapshots,
                live: AtomicBool::new(true),
            }),
        }
    }

    /// Fetch every write-up and replace the session collection.
    ///
    /// In fallback mode the store is not contacted; the collection is seeded
    /// with the sample write-ups if nothing has been loaded yet and is
    /// otherwise kept as is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session was closed, or the
    /// store error when `fallback_on_load_error` is off and the failure is
    /// not a missing table or access rejection.
    pub async fn load(&self) -> Result<Snapshot> {
        self.ensure_live()?;
        if self.is_fallback() {
            return Ok(self.apply(|state| {
                if !state.loaded {
                    state.seed_fixtures();
                }
            }));
        }

        debug!(store = self.inner.store.name(), "Loading writeups");
        let result = self.inner.store.list().await;
        self.ensure_live()?;

        match result {
            Ok(mut rows) => {
                sort_newest_first(&mut rows);
                debug!(count = rows.len(), "Loaded writeups");
                Ok(self.apply(|state| {
                    state.writeups = rows.into_iter().map(Writeup::from).collect();
                    state.loaded = true;
                }))
            }
            Err(err) => {
                let reason = match err.kind {
                    FailureKind::TableNotFound => FallbackReason::TableMissing,
                    FailureKind::AccessDenied => FallbackReason::AccessDenied,
                    FailureKind::Other if self.inner.config.fallback_on_load_error => {
                        FallbackReason::LoadFailure(err.message.clone())
                    }
                    FailureKind::Other => {
                        warn!(error = %err, "Failed to load writeups");
                        return Err(err.into());
                    }
                };
                Ok(self.apply(|state| {
                    state.enter_fallback(reason);
                    state.seed_fixtures();
                }))
            }
        }
    }

    /// Load again. Same as [`SyncLayer::load`].
    ///
    /// # Errors
    ///
    /// See [`SyncLayer::load`].
    pub async fn refetch(&self) -> Result<Snapshot> {
        self.load().await
    }

    /// Add a write-up and put it at the front of the collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] if required fields are blank,
    /// [`Error::SessionClosed`] if the session was closed, or the store error
    /// for failures other than an access rejection.
    pub async fn create(&self, record: NewWriteup) -> Result<Writeup> {
        record.validate()?;
        self.ensure_live()?;
        if self.is_fallback() {
            return Ok(self.mutate(|state| state.create_local(record)));
        }

        let result = self.inner.store.insert(&record).await;
        self.ensure_live()?;

        match result {
            Ok(stored) => {
                let writeup = Writeup::from(stored);
                info!(id = %writeup.id, slug = %writeup.slug, "Created writeup");
                Ok(self.mutate(|state| {
                    state.writeups.insert(0, writeup.clone());
                    writeup
                }))
            }
            Err(err) => self.recover(err, |state| state.create_local(record)),
        }
    }

    /// Apply `patch` to the write-up with `id`.
    ///
    /// Locally, fields absent from the patch keep their current values; a
    /// record not in the collection is default-filled and returned without
    /// being added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] if the patch blanks the title or
    /// content, [`Error::SessionClosed`] if the session was closed, or the
    /// store error for failures other than an access rejection.
    pub async fn update(&self, id: &str, patch: WriteupPatch) -> Result<Writeup> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(Error::InvalidRecord { field: "title" });
        }
        if patch.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(Error::InvalidRecord { field: "content" });
        }
        self.ensure_live()?;
        if self.is_fallback() {
            return Ok(self.mutate(|state| state.update_local(id, patch)));
        }

        let result = self.inner.store.update_partial(id, &patch).await;
        self.ensure_live()?;

        match result {
            Ok(stored) => {
                let writeup = Writeup::from(stored);
                debug!(id = %writeup.id, "Updated writeup");
                Ok(self.mutate(|state| {
                    state.replace(&writeup);
                    writeup
                }))
            }
            Err(err) => self.recover(err, |state| state.update_local(id, patch)),
        }
    }

    /// Remove the write-up with `id`.
    ///
    /// Returns whether a record was removed from the collection. A missing
    /// id leaves the collection unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session was closed, or the
    /// store error for failures other than an access rejection.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.ensure_live()?;
        if self.is_fallback() {
            return Ok(self.mutate(|state| state.remove(id)));
        }

        let result = self.inner.store.delete(id).await;
        self.ensure_live()?;

        match result {
            Ok(()) => {
                debug!(id, "Deleted writeup");
                Ok(self.mutate(|state| state.remove(id)))
            }
            Err(err) => self.recover(err, |state| state.remove(id)),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Subscribe to snapshots published after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    /// Check if the session is serving local data only.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.mode() == Mode::Fallback
    }

    /// Why the session entered fallback, if it has.
    #[must_use]
    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        self.lock().reason.clone()
    }

    /// Look up a write-up in the collection by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Writeup> {
        self.lock().writeups.iter().find(|w| w.id == id).cloned()
    }

    /// End the session. Results arriving afterwards are discarded.
    pub fn close(&self) {
        if self.inner.live.swap(false, Ordering::SeqCst) {
            debug!("Session closed");
        }
    }

    /// Check if [`SyncLayer::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.inner.live.load(Ordering::SeqCst)
    }

    /// Handle a failed mutation. An access rejection switches to fallback
    /// and runs `local` instead; a missing table switches to fallback and
    /// still reports the error.
    fn recover<T>(&self, err: StoreError, local: impl FnOnce(&mut State) -> T) -> Result<T> {
        match err.kind {
            FailureKind::AccessDenied => Ok(self.mutate(|state| {
                state.enter_fallback(FallbackReason::AccessDenied);
                local(state)
            })),
            FailureKind::TableNotFound => {
                self.apply(|state| state.enter_fallback(FallbackReason::TableMissing));
                Err(err.into())
            }
            FailureKind::Other => {
                warn!(error = %err, "Store operation failed");
                Err(err.into())
            }
        }
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let (value, snapshot) = {
            let mut state = self.lock();
            let value = f(&mut state);
            (value, state.snapshot())
        };
        self.inner.snapshots.send_replace(snapshot);
        value
    }

    fn apply(&self, f: impl FnOnce(&mut State)) -> Snapshot {
        self.mutate(|state| {
            f(state);
            state.snapshot()
        })
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
