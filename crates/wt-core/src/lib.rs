//! Core domain logic for watchtime.
//!
//! This crate contains the fundamental types and logic for:
//! - Action parsing: classifying free-text activity log actions
//! - Title state: per-title episode progress and completed watch-throughs
//! - Ledger: replaying an ordered activity log into per-title histories
//! - Series: trailing-window watch-minute totals for charting

pub mod action;
pub mod grammar;
pub mod ledger;
pub mod lookup;
pub mod series;
pub mod title;
pub mod types;

pub use action::{ActionError, ActionRequest, RULES, Rule, parse_action};
pub use grammar::Grammar;
pub use ledger::{IngestStats, Ledger, LedgerError, LogEntry, ProcessedEntry};
pub use lookup::{DurationLookup, LookupError, StaticLookup, TitleInfo};
pub use series::{DailyMinutes, SeriesPoint, Window, WindowError, daily_minutes, windowed_series};
pub use title::{EditError, EventOutcome, TitleRecord, WatchEvent};
pub use types::{GrammarKind, TitleKey, ValidationError};
