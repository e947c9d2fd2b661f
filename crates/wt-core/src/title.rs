//! Per-title viewing state.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use thiserror::Error;

use crate::action::{ActionError, ActionRequest, parse_action};
use crate::grammar::Grammar;
use crate::lookup::{DurationLookup, LookupError};
use crate::types::TitleKey;

/// Errors from applying an action to a title.
#[derive(Debug, Error)]
pub enum EditError {
    /// The action text could not be interpreted.
    #[error(transparent)]
    Action(#[from] ActionError),
    /// The action implies completion but the title's total is unknown.
    #[error("cannot complete ongoing title {title}: {action}")]
    OngoingCompletion { title: String, action: String },
    /// The episode count would overflow the title's progress.
    #[error("episode progress of {title} overflows: {action}")]
    ProgressOverflow { title: String, action: String },
    /// Episode metadata was unavailable.
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Episodes attributed to one log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchEvent {
    /// When the entry was logged.
    pub at: DateTime<FixedOffset>,
    /// Number of episodes watched.
    pub episodes: u32,
}

/// Result of applying one action to a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventOutcome {
    /// The title was removed from the list; its cycle was cleared.
    Removed,
    /// Not a viewing action.
    Ignored,
    /// Episodes watched within an ongoing cycle.
    PartialProgress { episode_delta: u32 },
    /// The cycle was closed.
    CycleCompleted {
        episode_delta: u32,
        completed_cycles: u32,
    },
}

impl EventOutcome {
    /// Episodes this outcome recorded, if any.
    pub const fn episode_delta(&self) -> Option<u32> {
        match self {
            Self::Removed | Self::Ignored => None,
            Self::PartialProgress { episode_delta }
            | Self::CycleCompleted { episode_delta, .. } => Some(*episode_delta),
        }
    }
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Removed => write!(f, "removed from list"),
            Self::Ignored => write!(f, "skipped"),
            Self::PartialProgress { episode_delta } => {
                write!(f, "watched {episode_delta} episodes")
            }
            Self::CycleCompleted {
                episode_delta,
                completed_cycles,
            } => write!(
                f,
                "watched {episode_delta} episodes (completed viewing #{completed_cycles})"
            ),
        }
    }
}

/// Viewing state of a single title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleRecord {
    key: TitleKey,
    title: String,
    current_episode: u32,
    completed_cycles: u32,
    events: Vec<WatchEvent>,
}

impl TitleRecord {
    pub fn new(key: TitleKey, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            current_episode: 0,
            completed_cycles: 0,
            events: Vec::new(),
        }
    }

    pub const fn key(&self) -> &TitleKey {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn set_title(&mut self, title: &str) {
        if self.title != title {
            self.title = title.to_string();
        }
    }

    /// Episodes watched in the in-progress cycle.
    pub const fn current_episode(&self) -> u32 {
        self.current_episode
    }

    /// Number of completed watch-throughs.
    pub const fn completed_cycles(&self) -> u32 {
        self.completed_cycles
    }

    /// Recorded events in processing order.
    pub fn events(&self) -> &[WatchEvent] {
        &self.events
    }

    /// Drops the current cycle. Completed cycles are kept.
    pub fn clear(&mut self) {
        self.events.clear();
        self.current_episode = 0;
    }

    /// Applies one logged action.
    ///
    /// Metadata is only requested for viewing actions. A count that would
    /// take progress past a known total closes the cycle instead, recording
    /// the `n` episodes logged rather than the `total - current` remainder a
    /// completion action records.
    pub fn edit<L: DurationLookup + ?Sized>(
        &mut self,
        grammar: &Grammar,
        action: &str,
        at: DateTime<FixedOffset>,
        lookup: &L,
    ) -> Result<EventOutcome, EditError> {
        match parse_action(grammar, action)? {
            ActionRequest::Remove => {
                self.clear();
                Ok(EventOutcome::Removed)
            }
            ActionRequest::Ignore => Ok(EventOutcome::Ignored),
            ActionRequest::Watched { episodes } => {
                let info = lookup.lookup(&self.key)?;
                let overflows = info
                    .known_total()
                    .is_some_and(|total| self.current_episode.saturating_add(episodes) > total);
                if overflows {
                    tracing::debug!(
                        title = %self.title,
                        current = self.current_episode,
                        episodes,
                        total = info.total_episodes,
                        "progress passes the known total, closing cycle"
                    );
                    return Ok(self.complete(at, episodes));
                }
                let Some(current) = self.current_episode.checked_add(episodes) else {
                    return Err(EditError::ProgressOverflow {
                        title: self.title.clone(),
                        action: action.trim().to_string(),
                    });
                };
                self.events.push(WatchEvent { at, episodes });
                self.current_episode = current;
                Ok(EventOutcome::PartialProgress {
                    episode_delta: episodes,
                })
            }
            ActionRequest::CompleteCycle => {
                let info = lookup.lookup(&self.key)?;
                let Some(total) = info.known_total() else {
                    return Err(EditError::OngoingCompletion {
                        title: self.title.clone(),
                        action: action.trim().to_string(),
                    });
                };
                let remaining = total.saturating_sub(self.current_episode);
                Ok(self.complete(at, remaining))
            }
        }
    }

    fn complete(&mut self, at: DateTime<FixedOffset>, episodes: u32) -> EventOutcome {
        self.events.push(WatchEvent { at, episodes });
        self.current_episode = 0;
        self.completed_cycles += 1;
        EventOutcome::CycleCompleted {
            episode_delta: episodes,
            completed_cycles: self.completed_cycles,
        }
    }
}
