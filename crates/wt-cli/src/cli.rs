//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use wt_core::GrammarKind;

use crate::commands::util::LogArgs;

/// Anime watch-time history.
///
/// Replays an exported activity log into per-title viewing histories and
/// charts minutes watched over a trailing window.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Language of the activity log (en, ru).
    #[arg(short, long, global = true)]
    pub grammar: Option<GrammarKind>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay the log and print what happened to every title.
    Timeline(TimelineArgs),

    /// Print trailing-window watch minutes.
    Series(SeriesArgs),

    /// Inspect or seed the title metadata cache.
    #[command(subcommand)]
    Cache(CacheAction),
}

#[derive(Debug, Args)]
pub struct TimelineArgs {
    #[command(flatten)]
    pub log: LogArgs,

    /// Only print the per-title summary.
    #[arg(short, long)]
    pub quiet: bool,

    /// Output as JSON.
    #[arg(long, conflicts_with = "quiet")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SeriesArgs {
    #[command(flatten)]
    pub log: LogArgs,

    /// Window width in days (defaults to config).
    #[arg(long)]
    pub span: Option<u32>,

    /// Days between samples (defaults to config).
    #[arg(long)]
    pub step: Option<u32>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Metadata cache actions.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// List cached titles.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Store metadata for a title by hand.
    Set {
        /// Title key (page link).
        key: String,

        /// Total episodes, 0 for an ongoing title.
        total: u32,

        /// Minutes per episode.
        minutes: u32,
    },
}
