//! Series command for trailing-window watch time.
//!
//! This module implements `wt series`, which replays the log, converts
//! recorded episodes to minutes, and samples the trailing-window totals as a
//! table or JSON.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use wt_core::{
    DurationLookup, GrammarKind, Ledger, LogEntry, SeriesPoint, Window, daily_minutes,
    windowed_series,
};
use wt_db::CachedLookup;

use super::util::{format_minutes, open_database, progress_bar};
use crate::{Config, RemoteLookup, SeriesArgs};

const BAR_WIDTH: usize = 30;

/// Replays `entries` and samples the watch-minutes series.
pub fn build_series<L: DurationLookup + ?Sized>(
    entries: &[LogEntry],
    grammar: GrammarKind,
    lookup: &L,
    window: Window,
) -> Result<Vec<SeriesPoint>> {
    let mut ledger = Ledger::new(grammar);
    ledger.process_all(entries, lookup, |processed| {
        tracing::debug!(%processed, "applied");
    })?;
    let daily = daily_minutes(ledger.titles(), lookup)?;
    tracing::debug!(days = daily.len(), "daily totals computed");
    Ok(windowed_series(&daily, window))
}

/// Formats the series as a table with a bar per sample.
pub fn format_series(points: &[SeriesPoint], window: Window) -> String {
    let mut output = String::new();

    writeln!(
        output,
        "WATCH TIME (last {} days, every {} days)",
        window.span_days(),
        window.step_days()
    )
    .unwrap();
    writeln!(output).unwrap();

    if points.is_empty() {
        writeln!(output, "No episodes watched.").unwrap();
        return output;
    }

    let max = points.iter().map(|point| point.minutes).max().unwrap_or(0);
    for point in points {
        writeln!(
            output,
            "{}  {:>8}  {}",
            point.date.format("%Y-%m-%d"),
            format_minutes(point.minutes),
            progress_bar(point.minutes, max, BAR_WIDTH)
        )
        .unwrap();
    }

    output
}

/// Formats the series as a JSON array of `{date, minutes}` objects.
pub fn format_series_json(points: &[SeriesPoint]) -> Result<String> {
    Ok(serde_json::to_string_pretty(points)?)
}

/// Runs the series command.
pub fn run<W: Write>(config: &Config, args: &SeriesArgs, out: &mut W) -> Result<()> {
    let window = Window::new(
        args.span.unwrap_or(config.span_days),
        args.step.unwrap_or(config.step_days),
    )
    .context("invalid window")?;
    let entries = args.log.read()?;
    let db = open_database(config)?;
    let lookup = CachedLookup::new(&db, RemoteLookup::new(config)?);

    let points = build_series(&entries, config.grammar, &lookup, window)?;
    if args.json {
        writeln!(out, "{}", format_series_json(&points)?)?;
    } else {
        write!(out, "{}", format_series(&points, window))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use wt_core::{StaticLookup, TitleInfo, TitleKey};

    fn entry(action: &str, timestamp: &str) -> LogEntry {
        LogEntry {
            title: "Frieren".to_string(),
            key: Some("/animes/1".to_string()),
            action: action.to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    fn entries() -> Vec<LogEntry> {
        vec![
            entry("Watched 2 episodes", "2024-01-01T20:00:00+03:00"),
            entry("Watched 3rd episode", "2024-01-11T20:00:00+03:00"),
            entry("Watched 4th to 6th episode", "2024-02-10T20:00:00+03:00"),
        ]
    }

    fn lookup() -> StaticLookup {
        StaticLookup::new().with(TitleKey::new("/animes/1").unwrap(), TitleInfo::new(0, 30))
    }

    #[test]
    fn build_series_samples_trailing_windows() {
        let points =
            build_series(&entries(), GrammarKind::En, &lookup(), Window::new(30, 10).unwrap())
                .unwrap();

        let json = format_series_json(&points).unwrap();
        assert_snapshot!(json, @r#"
        [
          {
            "date": "2024-01-21",
            "minutes": 90
          },
          {
            "date": "2024-01-31",
            "minutes": 30
          },
          {
            "date": "2024-02-10",
            "minutes": 90
          }
        ]
        "#);
    }

    #[test]
    fn format_series_draws_bars() {
        let window = Window::new(30, 10).unwrap();
        let points = build_series(&entries(), GrammarKind::En, &lookup(), window).unwrap();

        let output = format_series(&points, window);

        assert_snapshot!(output, @r"
        WATCH TIME (last 30 days, every 10 days)

        2024-01-21    1h 30m  ██████████████████████████████
        2024-01-31       30m  ██████████░░░░░░░░░░░░░░░░░░░░
        2024-02-10    1h 30m  ██████████████████████████████
        ");
    }

    #[test]
    fn empty_log_has_no_samples() {
        let window = Window::default();
        let points = build_series(&[], GrammarKind::En, &lookup(), window).unwrap();

        assert!(points.is_empty());
        assert_eq!(format_series_json(&points).unwrap(), "[]");
        assert!(format_series(&points, window).contains("No episodes watched."));
    }

    #[test]
    fn russian_log_uses_russian_grammar() {
        let entries = [
            entry("Просмотрено 2 эпизода", "2024-01-01T20:00:00+03:00"),
            entry("Просмотрен 3-й эпизод", "2024-01-02T20:00:00+03:00"),
        ];

        let points =
            build_series(&entries, GrammarKind::Ru, &lookup(), Window::new(7, 7).unwrap())
                .unwrap();

        assert_eq!(
            points,
            vec![SeriesPoint {
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                minutes: 90
            }]
        );
    }
}
