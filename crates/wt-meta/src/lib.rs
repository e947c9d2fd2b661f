//! Title page metadata fetcher for watchtime.
//!
//! Downloads a title's page and extracts the episode count and the episode
//! duration from its info block. Both the English and the Russian page
//! labels are recognized.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use wt_core::{TitleInfo, TitleKey};

/// Default request timeout for page fetches.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static EPISODES_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| info_field_regex("(?:Episodes|Эпизоды)"));

static DURATION_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| info_field_regex("(?:Episode duration|Длительность эпизода)"));

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

fn info_field_regex(label: &str) -> Regex {
    Regex::new(&format!(
        r#"(?s)<div class=["']key["']>\s*{label}:\s*</div>\s*<div class=["']value["']>(.*?)</div>"#
    ))
    .unwrap()
}

/// Metadata fetch errors.
#[derive(Debug, Error)]
pub enum MetaError {
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The page answered with a non-success status.
    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },
    /// The page has no such info field.
    #[error("title page has no {field} field")]
    MissingField { field: &'static str },
    /// The info field could not be interpreted.
    #[error("failed to parse {field} ({reason}): {value}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// HTTP client for title pages.
///
/// The client is cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Creates a client resolving relative title links against `base_url`.
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, MetaError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(MetaError::ClientBuild)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    /// Absolute page URL for a title key.
    pub fn page_url(&self, key: &TitleKey) -> String {
        let key = key.as_str();
        if key.starts_with("http://") || key.starts_with("https://") {
            return key.to_string();
        }
        if key.starts_with('/') {
            format!("{}{key}", self.base_url)
        } else {
            format!("{}/{key}", self.base_url)
        }
    }

    /// Fetches and parses a title page.
    pub async fn fetch_title_info(&self, key: &TitleKey) -> Result<TitleInfo, MetaError> {
        let url = self.page_url(key);
        tracing::info!(%url, "fetching title metadata");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MetaError::Status {
                url,
                status: status.as_u16(),
            });
        }
        parse_title_page(&body)
    }
}

/// Extracts episode metadata from a title page.
///
/// A page without an episodes field describes a single-episode title.
pub fn parse_title_page(html: &str) -> Result<TitleInfo, MetaError> {
    let total_episodes = match field_text(&EPISODES_FIELD_RE, html) {
        Some(value) => parse_episodes(&value)?,
        None => 1,
    };
    let duration = field_text(&DURATION_FIELD_RE, html).ok_or(MetaError::MissingField {
        field: "episode duration",
    })?;
    let minutes_per_episode = parse_duration(&duration)?;
    Ok(TitleInfo::new(total_episodes, minutes_per_episode))
}

fn field_text(field: &Regex, html: &str) -> Option<String> {
    let raw = field.captures(html)?.get(1)?.as_str();
    let text = TAG_RE.replace_all(raw, " ").replace("&nbsp;", " ");
    Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Parses an episodes field: `12`, `5 / 12` (aired / total) or `5 / ?`.
///
/// An unknown total yields 0, the ongoing marker.
pub fn parse_episodes(value: &str) -> Result<u32, MetaError> {
    let total = value.rsplit('/').next().unwrap_or(value).trim();
    if total.contains('?') {
        return Ok(0);
    }
    total.parse().map_err(|_| MetaError::InvalidField {
        field: "episodes",
        value: value.to_string(),
        reason: "not a number",
    })
}

/// Parses an episode duration such as `24 min.` or `1 hr. 30 min.` into
/// minutes.
pub fn parse_duration(value: &str) -> Result<u32, MetaError> {
    let invalid = |reason| MetaError::InvalidField {
        field: "episode duration",
        value: value.to_string(),
        reason,
    };

    let tokens: Vec<&str> = value.split_whitespace().collect();
    let mut minutes = 0_u32;
    let mut seen_number = false;
    for (idx, token) in tokens.iter().enumerate() {
        let Ok(amount) = token.parse::<u32>() else {
            continue;
        };
        seen_number = true;
        let unit = tokens
            .get(idx + 1)
            .ok_or_else(|| invalid("number without unit"))?
            .to_lowercase();
        let per_unit = if ["час", "hr", "hour"].iter().any(|u| unit.contains(u)) {
            60
        } else if ["мин", "min"].iter().any(|u| unit.contains(u)) {
            1
        } else {
            return Err(invalid("unknown unit"));
        };
        minutes = amount
            .checked_mul(per_unit)
            .and_then(|value| minutes.checked_add(value))
            .ok_or_else(|| invalid("too large"))?;
    }
    if !seen_number {
        return Err(invalid("no duration"));
    }
    Ok(minutes)
}
