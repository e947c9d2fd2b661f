//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid grammar name.
    #[error("unknown grammar: {value} (expected `en` or `ru`)")]
    UnknownGrammar { value: String },
}

/// A validated title key.
///
/// Title keys identify a title across log entries and are used to query
/// episode metadata. In practice this is the title page link from the log.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TitleKey(String);

impl TitleKey {
    /// Creates a new key after validation. Surrounding whitespace is trimmed.
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "title key" });
        }
        if trimmed.len() == key.len() {
            return Ok(Self(key));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TitleKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TitleKey> for String {
    fn from(key: TitleKey) -> Self {
        key.0
    }
}

impl fmt::Display for TitleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TitleKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which log language the action text is written in.
///
/// A run uses exactly one grammar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrammarKind {
    /// English activity log ("watched 5 episodes").
    #[default]
    En,
    /// Russian activity log ("просмотрено 5 эпизодов").
    Ru,
}

impl GrammarKind {
    /// String representation used in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
        }
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GrammarKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "ru" | "russian" => Ok(Self::Ru),
            _ => Err(ValidationError::UnknownGrammar {
                value: s.to_string(),
            }),
        }
    }
}
