//! Per-title episode metadata lookup.
//!
//! The core never fetches or caches metadata itself. Everything that needs an
//! episode total or an episode duration receives a [`DurationLookup`], so the
//! network fetcher, the `SQLite` cache and test fixtures are interchangeable.

use std::collections::HashMap;
use std::error::Error as StdError;

use thiserror::Error;

use crate::types::TitleKey;

/// Episode metadata for one title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleInfo {
    /// Total number of episodes. Zero means the title is ongoing and the
    /// total is unknown.
    pub total_episodes: u32,
    /// Duration of a single episode in minutes.
    pub minutes_per_episode: u32,
}

impl TitleInfo {
    pub const fn new(total_episodes: u32, minutes_per_episode: u32) -> Self {
        Self {
            total_episodes,
            minutes_per_episode,
        }
    }

    /// Returns the total if it is known.
    #[must_use]
    pub const fn known_total(&self) -> Option<u32> {
        if self.total_episodes == 0 {
            None
        } else {
            Some(self.total_episodes)
        }
    }
}

/// Metadata lookup errors.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The lookup has no metadata for this title.
    #[error("no episode metadata for {key}")]
    NotFound { key: String },
    /// The underlying source failed (network, storage, parse).
    #[error("episode metadata lookup failed for {key}")]
    Failed {
        key: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl LookupError {
    /// Wraps a collaborator error for the given key.
    pub fn failed(key: &TitleKey, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Failed {
            key: key.to_string(),
            source: source.into(),
        }
    }
}

/// Resolves `(total_episodes, minutes_per_episode)` for a title.
///
/// Implementations may be slow (network-bound); callers treat each call as a
/// blocking request and do not retry.
pub trait DurationLookup {
    fn lookup(&self, key: &TitleKey) -> Result<TitleInfo, LookupError>;
}

impl<T: DurationLookup + ?Sized> DurationLookup for &T {
    fn lookup(&self, key: &TitleKey) -> Result<TitleInfo, LookupError> {
        (**self).lookup(key)
    }
}

/// In-memory lookup backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    entries: HashMap<TitleKey, TitleInfo>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the metadata for a title.
    #[must_use]
    pub fn with(mut self, key: TitleKey, info: TitleInfo) -> Self {
        self.entries.insert(key, info);
        self
    }

    pub fn insert(&mut self, key: TitleKey, info: TitleInfo) {
        self.entries.insert(key, info);
    }
}

impl DurationLookup for StaticLookup {
    fn lookup(&self, key: &TitleKey) -> Result<TitleInfo, LookupError> {
        self.entries
            .get(key)
            .copied()
            .ok_or_else(|| LookupError::NotFound {
                key: key.to_string(),
            })
    }
}
