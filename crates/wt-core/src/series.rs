//! Trailing-window watch time series.
//!
//! # Algorithm Summary
//!
//! 1. Convert every recorded episode delta to minutes and sum them per
//!    calendar day.
//! 2. Walk the days newest first with two cursors while a sample date steps
//!    backward from one step past the last day:
//!    - `right` removes days newer than the current sample,
//!    - `left` adds days less than `span` days older than the sample.
//! 3. Stop once every day has entered a window; emit samples oldest first.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::lookup::{DurationLookup, LookupError};
use crate::title::TitleRecord;

/// Default window width from the reference charts.
pub const DEFAULT_SPAN_DAYS: u32 = 49;
/// Default distance between samples.
pub const DEFAULT_STEP_DAYS: u32 = 14;

/// Window configuration errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    #[error("window span must be at least one day")]
    ZeroSpan,
    #[error("window step must be at least one day")]
    ZeroStep,
}

/// Sampling window, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    span_days: u32,
    step_days: u32,
}

impl Window {
    pub const fn new(span_days: u32, step_days: u32) -> Result<Self, WindowError> {
        if span_days == 0 {
            return Err(WindowError::ZeroSpan);
        }
        if step_days == 0 {
            return Err(WindowError::ZeroStep);
        }
        Ok(Self {
            span_days,
            step_days,
        })
    }

    pub const fn span_days(&self) -> u32 {
        self.span_days
    }

    pub const fn step_days(&self) -> u32 {
        self.step_days
    }
}

impl Default for Window {
    fn default() -> Self {
        Self {
            span_days: DEFAULT_SPAN_DAYS,
            step_days: DEFAULT_STEP_DAYS,
        }
    }
}

/// One output sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    /// Minutes watched in the window ending at `date`.
    pub minutes: i64,
}

/// Minutes watched per calendar day.
pub type DailyMinutes = BTreeMap<NaiveDate, i64>;

/// Sums watch minutes per day across titles.
///
/// Days are taken in each timestamp's own offset. Titles without events are
/// not looked up.
pub fn daily_minutes<'a, I, L>(titles: I, lookup: &L) -> Result<DailyMinutes, LookupError>
where
    I: IntoIterator<Item = &'a TitleRecord>,
    L: DurationLookup + ?Sized,
{
    let mut daily = DailyMinutes::new();
    for record in titles {
        if record.events().is_empty() {
            continue;
        }
        let info = lookup.lookup(record.key())?;
        let minutes_per_episode = i64::from(info.minutes_per_episode);
        for event in record.events() {
            *daily.entry(event.at.date_naive()).or_insert(0) +=
                i64::from(event.episodes) * minutes_per_episode;
        }
    }
    Ok(daily)
}

/// Samples trailing-window totals every `step` days, newest sample on the
/// last recorded day.
///
/// A day exactly `span` days before a sample is outside that sample's window.
/// An empty input produces an empty series.
pub fn windowed_series(daily: &DailyMinutes, window: Window) -> Vec<SeriesPoint> {
    let days: Vec<(NaiveDate, i64)> = daily
        .iter()
        .map(|(day, minutes)| (*day, *minutes))
        .collect();
    let Some(&(last_day, _)) = days.last() else {
        return Vec::new();
    };
    let step = Duration::days(i64::from(window.step_days));
    let span = Duration::days(i64::from(window.span_days));

    // Both cursors count days not yet handled, from the oldest.
    let mut right = days.len();
    let mut left = days.len();
    let mut total = 0_i64;
    let mut points = Vec::new();
    let Some(mut sample) = last_day.checked_add_signed(step) else {
        return Vec::new();
    };

    while left > 0 {
        let Some(previous) = sample.checked_sub_signed(step) else {
            break;
        };
        sample = previous;
        while right > 0 && days[right - 1].0 > sample {
            total -= days[right - 1].1;
            right -= 1;
        }
        while left > 0 && sample - days[left - 1].0 < span {
            total += days[left - 1].1;
            left -= 1;
        }
        points.push(SeriesPoint {
            date: sample,
            minutes: total,
        });
    }

    points.reverse();
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Ledger, LogEntry};
    use crate::lookup::{StaticLookup, TitleInfo};
    use crate::types::{GrammarKind, TitleKey};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    fn daily(entries: &[(i64, i64)]) -> DailyMinutes {
        entries.iter().map(|&(d, m)| (day(d), m)).collect()
    }

    /// Direct summation of the window ending at `sample`.
    fn window_sum(daily: &DailyMinutes, sample: NaiveDate, span: i64) -> i64 {
        daily
            .iter()
            .filter(|(d, _)| **d <= sample && (sample - **d).num_days() < span)
            .map(|(_, m)| m)
            .sum()
    }

    #[test]
    fn window_rejects_zero_sizes() {
        assert_eq!(Window::new(0, 1), Err(WindowError::ZeroSpan));
        assert_eq!(Window::new(1, 0), Err(WindowError::ZeroStep));
        assert_eq!(Window::default().span_days(), 49);
        assert_eq!(Window::default().step_days(), 14);
    }

    #[test]
    fn empty_input_produces_empty_series() {
        assert!(windowed_series(&DailyMinutes::new(), Window::default()).is_empty());
    }

    #[test]
    fn three_event_scenario_matches_direct_sums() {
        let daily = daily(&[(0, 60), (10, 30), (40, 90)]);
        let series = windowed_series(&daily, Window::new(30, 10).unwrap());

        assert_eq!(
            series,
            vec![
                SeriesPoint {
                    date: day(20),
                    minutes: 90
                },
                SeriesPoint {
                    date: day(30),
                    minutes: 30
                },
                SeriesPoint {
                    date: day(40),
                    minutes: 90
                },
            ]
        );
        for point in &series {
            assert_eq!(point.minutes, window_sum(&daily, point.date, 30));
        }
    }

    #[test]
    fn day_exactly_span_before_sample_is_excluded() {
        let window = Window::new(10, 10).unwrap();

        let series = windowed_series(&daily(&[(0, 5), (10, 7)]), window);
        assert_eq!(
            series,
            vec![
                SeriesPoint {
                    date: day(0),
                    minutes: 5
                },
                SeriesPoint {
                    date: day(10),
                    minutes: 7
                },
            ]
        );

        let series = windowed_series(&daily(&[(1, 5), (10, 7)]), window);
        assert_eq!(
            series,
            vec![SeriesPoint {
                date: day(10),
                minutes: 12
            }]
        );
    }

    #[test]
    fn single_day_produces_single_sample() {
        let series = windowed_series(&daily(&[(3, 42)]), Window::new(7, 2).unwrap());
        assert_eq!(
            series,
            vec![SeriesPoint {
                date: day(3),
                minutes: 42
            }]
        );
    }

    #[test]
    fn series_matches_direct_sums_for_irregular_days() {
        let daily = daily(&[
            (0, 24),
            (1, 48),
            (5, 20),
            (17, 96),
            (18, 24),
            (40, 120),
            (41, 23),
            (77, 46),
            (90, 24),
        ]);
        for (span, step) in [(49, 14), (30, 10), (7, 7), (3, 5), (1, 1), (100, 3)] {
            let series = windowed_series(&daily, Window::new(span, step).unwrap());
            assert!(!series.is_empty());
            assert_eq!(series.last().unwrap().date, day(90));
            for pair in series.windows(2) {
                assert_eq!((pair[1].date - pair[0].date).num_days(), i64::from(step));
            }
            for point in &series {
                assert_eq!(
                    point.minutes,
                    window_sum(&daily, point.date, i64::from(span)),
                    "span {span} step {step} at {}",
                    point.date
                );
            }
            // The oldest sample is the first whose window reaches the first day.
            let first = series.first().unwrap().date;
            assert!((first - day(0)).num_days() < i64::from(span));
        }
    }

    #[test]
    fn aggregation_is_repeatable() {
        let daily = daily(&[(0, 60), (10, 30), (40, 90)]);
        let window = Window::new(30, 10).unwrap();
        assert_eq!(windowed_series(&daily, window), windowed_series(&daily, window));
    }

    #[test]
    fn daily_minutes_multiplies_by_episode_duration() {
        let lookup = StaticLookup::new()
            .with(TitleKey::new("/animes/1").unwrap(), TitleInfo::new(12, 24))
            .with(TitleKey::new("/animes/2").unwrap(), TitleInfo::new(0, 23))
            .with(TitleKey::new("/animes/3").unwrap(), TitleInfo::new(1, 110));
        let log = [
            ("/animes/1", "Watched 3 episodes", "2024-01-01T21:00:00+03:00"),
            ("/animes/2", "Watched 2 episodes", "2024-01-01T23:30:00+03:00"),
            ("/animes/1", "Watched", "2024-01-02T01:00:00+03:00"),
            ("/animes/3", "Added to list", "2024-01-03T12:00:00+03:00"),
        ]
        .map(|(key, action, timestamp)| LogEntry {
            title: key.to_string(),
            key: Some(key.to_string()),
            action: action.to_string(),
            timestamp: timestamp.to_string(),
        });
        let mut ledger = Ledger::new(GrammarKind::En);
        ledger.process_all(&log, &lookup, |_| {}).unwrap();

        let daily = daily_minutes(ledger.titles(), &lookup).unwrap();

        assert_eq!(daily, self::daily(&[(0, 3 * 24 + 2 * 23), (1, 9 * 24)]));
    }

    #[test]
    fn daily_minutes_propagates_lookup_failure() {
        let full =
            StaticLookup::new().with(TitleKey::new("/animes/1").unwrap(), TitleInfo::new(0, 24));
        let mut ledger = Ledger::new(GrammarKind::En);
        let entry = LogEntry {
            title: "Frieren".to_string(),
            key: Some("/animes/1".to_string()),
            action: "Watched 1 episode".to_string(),
            timestamp: "2024-01-01T21:00:00Z".to_string(),
        };
        ledger.process(&entry, &full).unwrap();

        let err = daily_minutes(ledger.titles(), &StaticLookup::new()).unwrap_err();
        assert!(matches!(err, LookupError::NotFound { .. }));
    }
}
