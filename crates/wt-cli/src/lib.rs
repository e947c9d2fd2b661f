//! Watch-time history CLI library.
//!
//! This crate provides the CLI interface for watchtime.

mod cli;
pub mod commands;
mod config;
mod lookup;

pub use cli::{CacheAction, Cli, Commands, SeriesArgs, TimelineArgs};
pub use config::Config;
pub use lookup::RemoteLookup;
