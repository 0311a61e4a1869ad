//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Shotline CLI - production tracking and asset pipeline sync client
#[derive(Parser, Debug)]
#[command(name = "shotline", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: <project>/.shotline/project.db)
    #[arg(long, global = true, env = "SHOTLINE_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON (for scripted integration)
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a Shotline project store in the current directory
    Init {
        /// Remote server URL or peer store path to record
        #[arg(long)]
        remote: Option<String>,

        /// User id recorded for assigned-task chunk selection
        #[arg(long)]
        user: Option<String>,

        /// Overwrite an existing store
        #[arg(long)]
        force: bool,
    },

    /// Pull remote project state into the local store
    Pull(SyncArgs),

    /// Push local changes to the remote
    Push {
        /// Remote override (defaults to the configured server)
        #[arg(long)]
        remote: Option<String>,
    },

    /// Clone a remote project into a fresh store
    Clone {
        /// Remote server URL or peer store path
        source: String,

        /// Destination directory (default: current directory)
        #[arg(long)]
        dest: Option<PathBuf>,

        /// User id recorded for assigned-task chunk selection
        #[arg(long)]
        user: Option<String>,
    },

    /// Show local sync state (unsynced rows, pending deletions, token)
    Status,

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Shared options for pull-shaped commands.
#[derive(clap::Args, Debug, Default)]
pub struct SyncArgs {
    /// Remote override (defaults to the configured server)
    #[arg(long)]
    pub remote: Option<String>,

    /// Bypass the sync-token fast path and fetch the full dataset
    #[arg(long)]
    pub force: bool,

    /// Also pull binary data for dependency-flagged tasks
    #[arg(long)]
    pub deps: bool,

    /// Pull binary data for every task, not just assigned ones
    #[arg(long)]
    pub everything: bool,
}
