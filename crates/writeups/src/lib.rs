//! `writeups` - Security write-up publishing core
//!
//! This library keeps a session's collection of write-ups in step with a
//! backing store, falling back to built-in sample data when the store is
//! missing or refuses access, and derives the groupings, counts and filtered
//! listings readers see.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod logging;
pub mod record;
pub mod store;
pub mod sync;
pub mod views;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{Difficulty, NewWriteup, Writeup, WriteupPatch};
pub use store::{FailureKind, RemoteStore, StoreError};
pub use sync::{FallbackReason, Mode, Snapshot, SyncLayer};
