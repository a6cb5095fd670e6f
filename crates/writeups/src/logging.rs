//! Logging setup for writeups.
//!
//! Diagnostics are emitted with `tracing` and written to stderr, so listings
//! and JSON on stdout can be piped. `RUST_LOG` replaces the flag-derived
//! filter entirely when set.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much diagnostic output the CLI produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only, from every crate.
    Quiet,
    /// Info from this crate, warnings from dependencies.
    #[default]
    Normal,
    /// Debug from this crate (`-v`).
    Verbose,
    /// Trace from this crate (`-vv` and up).
    Trace,
}

impl Verbosity {
    /// Map the `-v` count and `-q` flag to a level. Quiet wins.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The most detailed level this crate logs at.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directives used when `RUST_LOG` is unset.
    #[must_use]
    pub fn directives(self) -> String {
        match self {
            Self::Quiet => "error".to_string(),
            _ => format!("warn,writeups={}", self.level()),
        }
    }
}

/// Install the global subscriber.
///
/// Call once at startup. A second call, or a call after an embedding
/// application installed its own subscriber, leaves the existing one alone.
///
/// # Examples
///
/// ```no_run
/// use writeups::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(1, false));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= Verbosity::Verbose),
        )
        .try_init();
}
