//! Viewing history reconstruction from an activity log.
//!
//! The ledger consumes log entries oldest first and keeps one
//! [`TitleRecord`] per title key. It never reorders its input: every title's
//! progress is a running accumulator, so entries must arrive in time order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grammar::Grammar;
use crate::lookup::DurationLookup;
use crate::title::{EditError, EventOutcome, TitleRecord};
use crate::types::{GrammarKind, TitleKey};

/// Ledger errors. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The entry timestamp is not RFC 3339.
    #[error("invalid timestamp {timestamp:?} for {title}")]
    Timestamp {
        title: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// The entry could not be applied to its title.
    #[error("failed to process {title} at {timestamp}")]
    Edit {
        title: String,
        timestamp: String,
        #[source]
        source: EditError,
    },
}

/// One row of the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogEntry {
    /// Display title.
    pub title: String,
    /// Stable title key (page link). Rows without one are not title rows.
    #[serde(default)]
    pub key: Option<String>,
    /// Action description with markup already stripped.
    pub action: String,
    /// ISO 8601 timestamp with offset.
    pub timestamp: String,
}

/// A log entry after it was applied, for progress reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedEntry {
    pub at: DateTime<FixedOffset>,
    pub title: String,
    pub action: String,
    pub outcome: EventOutcome,
}

impl fmt::Display for ProcessedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} - {} ({})",
            self.at, self.title, self.outcome, self.action
        )
    }
}

/// Counts from a full ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Entries applied to a title.
    pub processed: usize,
    /// Entries without a title key.
    pub skipped: usize,
}

/// Per-title viewing history.
#[derive(Debug)]
pub struct Ledger {
    grammar: &'static Grammar,
    titles: BTreeMap<TitleKey, TitleRecord>,
}

impl Ledger {
    pub fn new(grammar: GrammarKind) -> Self {
        Self {
            grammar: Grammar::for_kind(grammar),
            titles: BTreeMap::new(),
        }
    }

    /// Applies one entry.
    ///
    /// Returns `None` for rows that carry no title key.
    pub fn process<L: DurationLookup + ?Sized>(
        &mut self,
        entry: &LogEntry,
        lookup: &L,
    ) -> Result<Option<ProcessedEntry>, LedgerError> {
        let Some(key) = entry
            .key
            .as_deref()
            .and_then(|key| TitleKey::new(key).ok())
        else {
            tracing::debug!(title = %entry.title, "skipping log row without title key");
            return Ok(None);
        };

        let at = DateTime::parse_from_rfc3339(entry.timestamp.trim()).map_err(|source| {
            LedgerError::Timestamp {
                title: entry.title.clone(),
                timestamp: entry.timestamp.clone(),
                source,
            }
        })?;

        let record = self
            .titles
            .entry(key)
            .or_insert_with_key(|key| TitleRecord::new(key.clone(), entry.title.clone()));
        record.set_title(&entry.title);

        let action = entry.action.trim();
        let outcome = record
            .edit(self.grammar, action, at, lookup)
            .map_err(|source| LedgerError::Edit {
                title: entry.title.clone(),
                timestamp: entry.timestamp.clone(),
                source,
            })?;

        Ok(Some(ProcessedEntry {
            at,
            title: record.title().to_string(),
            action: action.to_string(),
            outcome,
        }))
    }

    /// Applies a whole chronologically ordered log.
    ///
    /// `report` sees every applied entry; it only observes.
    pub fn process_all<'a, I, L, F>(
        &mut self,
        entries: I,
        lookup: &L,
        mut report: F,
    ) -> Result<IngestStats, LedgerError>
    where
        I: IntoIterator<Item = &'a LogEntry>,
        L: DurationLookup + ?Sized,
        F: FnMut(&ProcessedEntry),
    {
        let mut stats = IngestStats::default();
        for entry in entries {
            match self.process(entry, lookup)? {
                Some(processed) => {
                    stats.processed += 1;
                    report(&processed);
                }
                None => stats.skipped += 1,
            }
        }
        tracing::debug!(
            processed = stats.processed,
            skipped = stats.skipped,
            titles = self.titles.len(),
            "log ingested"
        );
        Ok(stats)
    }

    /// Titles ordered by key.
    pub fn titles(&self) -> impl Iterator<Item = &TitleRecord> {
        self.titles.values()
    }

    pub fn get(&self, key: &TitleKey) -> Option<&TitleRecord> {
        self.titles.get(key)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}
