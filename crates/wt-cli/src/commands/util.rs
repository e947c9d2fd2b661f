//! Shared utilities for CLI commands.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use wt_core::LogEntry;
use wt_db::Database;

use crate::Config;

/// Activity log input shared by the log-driven commands.
#[derive(Debug, Args)]
pub struct LogArgs {
    /// Activity log as JSON Lines (`-` reads stdin).
    pub log: PathBuf,

    /// The log lists the newest entries first.
    #[arg(long)]
    pub newest_first: bool,
}

impl LogArgs {
    /// Reads the log in chronological order.
    pub fn read(&self) -> Result<Vec<LogEntry>> {
        let mut entries = if self.log.as_os_str() == "-" {
            parse_log(io::stdin().lock())?
        } else {
            let file = File::open(&self.log)
                .with_context(|| format!("failed to open {}", self.log.display()))?;
            parse_log(BufReader::new(file))
                .with_context(|| format!("failed to read {}", self.log.display()))?
        };
        if self.newest_first {
            entries.reverse();
        }
        Ok(entries)
    }
}

/// Parses one JSON log entry per line, skipping blank lines.
pub fn parse_log<R: BufRead>(reader: R) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry: LogEntry = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid log entry on line {}", idx + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Opens the metadata cache, ensuring the parent directory exists.
pub fn open_database(config: &Config) -> Result<Database> {
    open_database_at(&config.database_path)
}

fn open_database_at(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(path).with_context(|| format!("failed to open {}", path.display()))
}

/// Formats minutes as "Xh Ym" if >= 1 hour, "Xm" otherwise.
/// Negative totals are shown as 0m.
pub fn format_minutes(minutes: i64) -> String {
    if minutes < 0 {
        return "0m".to_string();
    }
    let hours = minutes / 60;
    let minutes = minutes % 60;
    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Generates a bar of `width` cells proportional to `value / max`.
/// Non-zero values below one cell still get a single block.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64, width: usize) -> String {
    if max <= 0 || value <= 0 {
        return "░".repeat(width);
    }
    let ratio = value as f64 / max as f64;
    let filled = ((ratio * width as f64).round() as usize).clamp(1, width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Truncates to `max` characters, marking the cut with `…`.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
