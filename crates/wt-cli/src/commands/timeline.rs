//! Timeline command: replays the log and reports every applied entry.
//!
//! This module implements `wt timeline`, which prints one line per applied
//! log entry followed by a per-title summary, or both as JSON.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use wt_core::{DurationLookup, GrammarKind, Ledger, LogEntry, ProcessedEntry, TitleRecord};
use wt_db::CachedLookup;

use super::util::{open_database, truncate};
use crate::{Config, RemoteLookup, TimelineArgs};

const TITLE_WIDTH: usize = 40;

/// Replays `entries` and renders the timeline.
///
/// Any entry that cannot be applied aborts the whole replay.
pub fn format_timeline<L: DurationLookup + ?Sized>(
    entries: &[LogEntry],
    grammar: GrammarKind,
    lookup: &L,
    quiet: bool,
) -> Result<String> {
    let mut output = String::new();
    let mut ledger = Ledger::new(grammar);
    let stats = ledger.process_all(entries, lookup, |processed| {
        if !quiet {
            writeln!(output, "{processed}").unwrap();
        }
    })?;

    if !quiet && stats.processed > 0 {
        writeln!(output).unwrap();
    }

    if ledger.is_empty() {
        writeln!(output, "No titles in the log.").unwrap();
        return Ok(output);
    }

    writeln!(
        output,
        "{:<40}  {:>7}  {:>7}  {:>6}",
        "Title", "Viewed", "Episode", "Events"
    )
    .unwrap();
    writeln!(
        output,
        "────────────────────────────────────────  ───────  ───────  ──────"
    )
    .unwrap();
    for record in ledger.titles() {
        writeln!(
            output,
            "{:<40}  {:>7}  {:>7}  {:>6}",
            truncate(record.title(), TITLE_WIDTH),
            record.completed_cycles(),
            record.current_episode(),
            record.events().len()
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(
        output,
        "{} entries applied, {} skipped, {} titles",
        stats.processed,
        stats.skipped,
        ledger.len()
    )
    .unwrap();

    Ok(output)
}

/// JSON output structure.
#[derive(Debug, Serialize)]
pub struct JsonTimeline<'a> {
    pub entries: &'a [ProcessedEntry],
    pub titles: Vec<&'a TitleRecord>,
    pub skipped: usize,
}

/// Replays `entries` and renders applied entries and final title states as
/// JSON.
pub fn format_timeline_json<L: DurationLookup + ?Sized>(
    entries: &[LogEntry],
    grammar: GrammarKind,
    lookup: &L,
) -> Result<String> {
    let mut ledger = Ledger::new(grammar);
    let mut processed = Vec::new();
    let stats = ledger.process_all(entries, lookup, |entry| processed.push(entry.clone()))?;

    let timeline = JsonTimeline {
        entries: &processed,
        titles: ledger.titles().collect(),
        skipped: stats.skipped,
    };
    Ok(serde_json::to_string_pretty(&timeline)?)
}

/// Runs the timeline command.
pub fn run<W: Write>(config: &Config, args: &TimelineArgs, out: &mut W) -> Result<()> {
    let entries = args.log.read()?;
    let db = open_database(config)?;
    let lookup = CachedLookup::new(&db, RemoteLookup::new(config)?);

    if args.json {
        let output = format_timeline_json(&entries, config.grammar, &lookup)?;
        writeln!(out, "{output}")?;
    } else {
        let output = format_timeline(&entries, config.grammar, &lookup, args.quiet)?;
        write!(out, "{output}")?;
    }
    Ok(())
}
