//! Cache command for the title metadata database.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result, bail};
use serde_json::json;
use wt_core::{TitleInfo, TitleKey};
use wt_db::{CachedTitle, Database};

use super::util::truncate;

/// Formats cached rows as a table. Ongoing titles show `?` episodes.
pub fn format_cache(rows: &[CachedTitle]) -> String {
    let mut output = String::new();

    if rows.is_empty() {
        writeln!(output, "No cached titles.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<50}  {:>8}  {:>7}  Fetched",
        "Key", "Episodes", "Minutes"
    )
    .unwrap();
    for row in rows {
        let episodes = row
            .info
            .known_total()
            .map_or_else(|| "?".to_string(), |total| total.to_string());
        writeln!(
            output,
            "{:<50}  {:>8}  {:>7}  {}",
            truncate(&row.key, 50),
            episodes,
            row.info.minutes_per_episode,
            row.fetched_at.format("%Y-%m-%d %H:%M")
        )
        .unwrap();
    }

    output
}

/// Formats cached rows as JSON.
pub fn format_cache_json(rows: &[CachedTitle]) -> Result<String> {
    let titles: Vec<_> = rows
        .iter()
        .map(|row| {
            json!({
                "key": row.key,
                "total_episodes": row.info.total_episodes,
                "minutes_per_episode": row.info.minutes_per_episode,
                "fetched_at": row.fetched_at.to_rfc3339(),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&titles)?)
}

/// Lists the cache.
pub fn list<W: Write>(db: &Database, json: bool, out: &mut W) -> Result<()> {
    let rows = db.list_title_info().context("failed to list cached titles")?;
    if json {
        writeln!(out, "{}", format_cache_json(&rows)?)?;
    } else {
        write!(out, "{}", format_cache(&rows))?;
    }
    Ok(())
}

/// Stores metadata for a title, replacing any cached row.
pub fn set<W: Write>(
    db: &Database,
    key: &str,
    total_episodes: u32,
    minutes_per_episode: u32,
    out: &mut W,
) -> Result<()> {
    let key = TitleKey::new(key)?;
    if minutes_per_episode == 0 {
        bail!("minutes per episode must be positive");
    }
    let info = TitleInfo::new(total_episodes, minutes_per_episode);
    db.put_title_info(&key, info)
        .with_context(|| format!("failed to cache {key}"))?;
    tracing::info!(%key, ?info, "metadata stored");
    writeln!(out, "Cached {key}")?;
    Ok(())
}
