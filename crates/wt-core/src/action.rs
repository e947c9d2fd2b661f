//! Action text classification.
//!
//! An action description is matched against [`RULES`] in order and the first
//! rule that recognizes the text decides the request. The order matters: a
//! removal entry may also mention an episode count, and a range phrase also
//! contains ordinals. Text no rule recognizes means "finished the remaining
//! episodes", which only the title state can resolve.

use thiserror::Error;

use crate::grammar::{Grammar, distinct};

/// Action parsing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// A range connective with anything other than two ordinals.
    #[error("invalid action (episode range with {ordinals} ordinals): {action}")]
    MalformedRange { action: String, ordinals: usize },
    /// A number that does not fit an episode count.
    #[error("invalid action (episode number {value} out of range): {action}")]
    InvalidNumber { action: String, value: String },
}

/// What an action asks the title state to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRequest {
    /// Drop the title's current cycle.
    Remove,
    /// Not a viewing action.
    Ignore,
    /// A known number of episodes was watched.
    Watched { episodes: u32 },
    /// The remaining episodes of the cycle were watched.
    CompleteCycle,
}

/// One classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Removal,
    NonViewing,
    EpisodeCount,
    Ordinals,
}

/// Classification rules in priority order.
pub const RULES: [Rule; 4] = [
    Rule::Removal,
    Rule::NonViewing,
    Rule::EpisodeCount,
    Rule::Ordinals,
];

impl Rule {
    /// Applies this rule, returning `None` if it does not recognize the text.
    pub fn apply(
        self,
        grammar: &Grammar,
        text: &str,
    ) -> Result<Option<ActionRequest>, ActionError> {
        match self {
            Self::Removal => Ok(grammar.is_removal(text).then_some(ActionRequest::Remove)),
            Self::NonViewing => Ok((!grammar.is_viewing(text)).then_some(ActionRequest::Ignore)),
            Self::EpisodeCount => grammar
                .episode_count(text)
                .map(|digits| {
                    parse_number(text, digits).map(|episodes| ActionRequest::Watched { episodes })
                })
                .transpose(),
            Self::Ordinals => ordinal_episodes(grammar, text)
                .map(|episodes| episodes.map(|episodes| ActionRequest::Watched { episodes })),
        }
    }
}

/// Classifies an action description.
pub fn parse_action(grammar: &Grammar, text: &str) -> Result<ActionRequest, ActionError> {
    let text = text.trim();
    for rule in RULES {
        if let Some(request) = rule.apply(grammar, text)? {
            tracing::trace!(?rule, ?request, text, "action classified");
            return Ok(request);
        }
    }
    Ok(ActionRequest::CompleteCycle)
}

fn ordinal_episodes(grammar: &Grammar, text: &str) -> Result<Option<u32>, ActionError> {
    let ordinals = grammar
        .ordinals(text)
        .into_iter()
        .map(|digits| parse_number(text, digits))
        .collect::<Result<Vec<_>, _>>()?;
    if ordinals.is_empty() {
        return Ok(None);
    }

    if !grammar.has_range(text) {
        let count = distinct(&ordinals);
        return u32::try_from(count)
            .map(Some)
            .map_err(|_| ActionError::InvalidNumber {
                action: text.to_string(),
                value: count.to_string(),
            });
    }

    let [first, second] = ordinals[..] else {
        return Err(ActionError::MalformedRange {
            action: text.to_string(),
            ordinals: ordinals.len(),
        });
    };
    let (low, high) = (first.min(second), first.max(second));
    Ok(Some((high - low).saturating_add(1)))
}

fn parse_number(text: &str, digits: &str) -> Result<u32, ActionError> {
    digits.parse().map_err(|_| ActionError::InvalidNumber {
        action: text.to_string(),
        value: digits.to_string(),
    })
}
