//! Command-line interface for writeups.
//!
//! This module provides the CLI structure for the `writeups` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CategoriesCommand, ConfigCommand, CreateCommand, DeleteCommand, FieldArgs, ListCommand,
    OutputFormat, SearchCommand, ShowCommand, StatsCommand, UpdateCommand,
};

/// writeups - Publish and browse security write-ups
///
/// Reads and edits write-ups in the configured store. When the store is
/// missing or refuses access, commands run against built-in sample data.
#[derive(Debug, Parser)]
#[command(name = "writeups")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List published write-ups
    List(ListCommand),

    /// Show a published write-up by slug
    Show(ShowCommand),

    /// Search titles and platforms, drafts included
    Search(SearchCommand),

    /// Show counts
    Stats(StatsCommand),

    /// Show write-ups grouped by platform
    Categories(CategoriesCommand),

    /// Create a write-up
    Create(CreateCommand),

    /// Change fields of a write-up
    Update(UpdateCommand),

    /// Delete a write-up
    Delete(DeleteCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Check if the command needs the store.
    #[must_use]
    pub fn uses_store(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
