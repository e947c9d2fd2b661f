//! Phrase sets used to classify activity log action text.
//!
//! Each grammar covers one log language. The patterns are compiled once and
//! shared for the lifetime of the process.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::GrammarKind;

struct Patterns {
    removal: &'static str,
    viewing: &'static str,
    episode_count: &'static str,
    ordinal: &'static str,
    range: &'static str,
}

const ENGLISH_PATTERNS: Patterns = Patterns {
    removal: r"(?i)\bremoved from (?:the )?list\b",
    viewing: r"(?i)\b(?:re)?watched\b",
    episode_count: r"(?i)\b(\d+)\s+episodes?\b",
    ordinal: r"(?i)\b(\d+)(?:st|nd|rd|th)\b",
    range: r"(?i)\b(?:to|through|thru)\b",
};

const RUSSIAN_PATTERNS: Patterns = Patterns {
    removal: r"(?i)удалено из списка",
    viewing: r"(?i)просмотр",
    episode_count: r"(\d+)\s+эпизод",
    ordinal: r"(\d+)-(?:й|го)",
    range: r"(?:^|\s)по(?:\s|$)",
};

static ENGLISH: LazyLock<Grammar> =
    LazyLock::new(|| Grammar::compile(GrammarKind::En, &ENGLISH_PATTERNS));

static RUSSIAN: LazyLock<Grammar> =
    LazyLock::new(|| Grammar::compile(GrammarKind::Ru, &RUSSIAN_PATTERNS));

/// Compiled phrase set for one log language.
#[derive(Debug)]
pub struct Grammar {
    kind: GrammarKind,
    removal: Regex,
    viewing: Regex,
    episode_count: Regex,
    ordinal: Regex,
    range: Regex,
}

impl Grammar {
    /// Returns the shared grammar for a log language.
    pub fn for_kind(kind: GrammarKind) -> &'static Self {
        match kind {
            GrammarKind::En => &ENGLISH,
            GrammarKind::Ru => &RUSSIAN,
        }
    }

    fn compile(kind: GrammarKind, patterns: &Patterns) -> Self {
        Self {
            kind,
            removal: Regex::new(patterns.removal).unwrap(),
            viewing: Regex::new(patterns.viewing).unwrap(),
            episode_count: Regex::new(patterns.episode_count).unwrap(),
            ordinal: Regex::new(patterns.ordinal).unwrap(),
            range: Regex::new(patterns.range).unwrap(),
        }
    }

    pub const fn kind(&self) -> GrammarKind {
        self.kind
    }

    /// Whether the text says the title was removed from the list.
    pub fn is_removal(&self, text: &str) -> bool {
        self.removal.is_match(text)
    }

    /// Whether the text describes watching anything at all.
    pub fn is_viewing(&self, text: &str) -> bool {
        self.viewing.is_match(text)
    }

    /// The digits of the first "N episodes" phrase, if any.
    pub fn episode_count<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.episode_count
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Digits of every ordinal episode marker, in order of appearance.
    pub fn ordinals<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.ordinal
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect()
    }

    /// Whether the text joins its ordinals with a "from ... to" connective.
    pub fn has_range(&self, text: &str) -> bool {
        self.range.is_match(text)
    }
}

/// Distinct ordinal values, for counting comma/"and"-joined lists.
pub(crate) fn distinct(values: &[u32]) -> usize {
    values.iter().collect::<BTreeSet<_>>().len()
}
