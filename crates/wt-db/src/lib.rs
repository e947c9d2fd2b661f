//! Storage layer for watchtime.
//!
//! Persists per-title episode metadata using `rusqlite`, so that each title
//! page is fetched at most once across runs.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! `title_info` holds one row per title key. `total_episodes = 0` marks an
//! ongoing title. `fetched_at` is stored as TEXT in ISO 8601 format
//! (e.g., `2024-01-15T10:30:00.000Z`).
//!
//! Rows are written as soon as a lookup succeeds; there is nothing to flush
//! on exit.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use wt_core::{DurationLookup, LookupError, TitleInfo, TitleKey};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid fetched_at for {key}: {timestamp}")]
    TimestampParse {
        key: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A cached metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTitle {
    pub key: String,
    pub info: TitleInfo,
    pub fetched_at: DateTime<Utc>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS title_info (
                key TEXT PRIMARY KEY,
                total_episodes INTEGER NOT NULL,
                minutes_per_episode INTEGER NOT NULL,
                fetched_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Returns the cached metadata for a title, if any.
    pub fn get_title_info(&self, key: &TitleKey) -> Result<Option<TitleInfo>, DbError> {
        let info = self
            .conn
            .query_row(
                "SELECT total_episodes, minutes_per_episode FROM title_info WHERE key = ?",
                [key.as_str()],
                |row| Ok(TitleInfo::new(row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(info)
    }

    /// Inserts or replaces the metadata for a title.
    pub fn put_title_info(&self, key: &TitleKey, info: TitleInfo) -> Result<(), DbError> {
        self.put_title_info_at(key, info, Utc::now())
    }

    fn put_title_info_at(
        &self,
        key: &TitleKey,
        info: TitleInfo,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO title_info (key, total_episodes, minutes_per_episode, fetched_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                total_episodes = excluded.total_episodes,
                minutes_per_episode = excluded.minutes_per_episode,
                fetched_at = excluded.fetched_at
            ",
            params![
                key.as_str(),
                info.total_episodes,
                info.minutes_per_episode,
                format_timestamp(fetched_at),
            ],
        )?;
        Ok(())
    }

    /// Lists all cached rows ordered by key.
    pub fn list_title_info(&self) -> Result<Vec<CachedTitle>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT key, total_episodes, minutes_per_episode, fetched_at
            FROM title_info
            ORDER BY key ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                TitleInfo::new(row.get(1)?, row.get(2)?),
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut titles = Vec::new();
        for row in rows {
            let (key, info, fetched_at) = row?;
            let fetched_at = parse_timestamp(&fetched_at, &key)?;
            titles.push(CachedTitle {
                key,
                info,
                fetched_at,
            });
        }
        Ok(titles)
    }
}

/// Read-through cache in front of another lookup.
///
/// Misses are delegated to `inner` and written to the database immediately.
pub struct CachedLookup<'a, L> {
    db: &'a Database,
    inner: L,
}

impl<'a, L: DurationLookup> CachedLookup<'a, L> {
    pub const fn new(db: &'a Database, inner: L) -> Self {
        Self { db, inner }
    }
}

impl<L: DurationLookup> DurationLookup for CachedLookup<'_, L> {
    fn lookup(&self, key: &TitleKey) -> Result<TitleInfo, LookupError> {
        if let Some(info) = self
            .db
            .get_title_info(key)
            .map_err(|err| LookupError::failed(key, err))?
        {
            tracing::debug!(%key, "metadata cache hit");
            return Ok(info);
        }

        let info = self.inner.lookup(key)?;
        self.db
            .put_title_info(key, info)
            .map_err(|err| LookupError::failed(key, err))?;
        tracing::debug!(%key, ?info, "metadata cached");
        Ok(info)
    }
}

fn parse_timestamp(timestamp: &str, key: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            key: key.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use chrono::TimeZone;
    use wt_core::StaticLookup;

    fn key(raw: &str) -> TitleKey {
        TitleKey::new(raw).unwrap()
    }

    /// Counts how often the cache falls through.
    struct CountingLookup {
        inner: StaticLookup,
        calls: Cell<usize>,
    }

    impl DurationLookup for CountingLookup {
        fn lookup(&self, key: &TitleKey) -> Result<TitleInfo, LookupError> {
            self.calls.set(self.calls.get() + 1);
            self.inner.lookup(key)
        }
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let mut stmt = db.conn.prepare("PRAGMA table_info(title_info)").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(|row| row.unwrap())
            .collect();
        assert_eq!(
            columns,
            vec![
                "key",
                "total_episodes",
                "minutes_per_episode",
                "fetched_at"
            ]
        );
    }

    #[test]
    fn put_then_get_round_trips_and_upserts() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let key = key("/animes/1");
        assert_eq!(db.get_title_info(&key).unwrap(), None);

        db.put_title_info(&key, TitleInfo::new(0, 24)).unwrap();
        db.put_title_info(&key, TitleInfo::new(28, 24)).unwrap();

        assert_eq!(db.get_title_info(&key).unwrap(), Some(TitleInfo::new(28, 24)));
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM title_info", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn list_title_info_returns_ordered_rows() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let fetched_at = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        db.put_title_info_at(&key("/animes/2"), TitleInfo::new(0, 23), fetched_at)
            .unwrap();
        db.put_title_info_at(&key("/animes/1"), TitleInfo::new(12, 24), fetched_at)
            .unwrap();

        let rows = db.list_title_info().unwrap();

        assert_eq!(
            rows,
            vec![
                CachedTitle {
                    key: "/animes/1".to_string(),
                    info: TitleInfo::new(12, 24),
                    fetched_at,
                },
                CachedTitle {
                    key: "/animes/2".to_string(),
                    info: TitleInfo::new(0, 23),
                    fetched_at,
                },
            ]
        );
    }

    #[test]
    fn list_title_info_rejects_corrupt_timestamp() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.conn
            .execute(
                "INSERT INTO title_info VALUES ('/animes/1', 12, 24, 'yesterday')",
                [],
            )
            .unwrap();

        let err = db.list_title_info().unwrap_err();
        assert!(matches!(err, DbError::TimestampParse { .. }));
    }

    #[test]
    fn cached_lookup_fetches_each_title_once() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let counting = CountingLookup {
            inner: StaticLookup::new().with(key("/animes/1"), TitleInfo::new(12, 24)),
            calls: Cell::new(0),
        };
        let cached = CachedLookup::new(&db, &counting);

        for _ in 0..3 {
            assert_eq!(
                cached.lookup(&key("/animes/1")).unwrap(),
                TitleInfo::new(12, 24)
            );
        }

        assert_eq!(counting.calls.get(), 1);
        assert_eq!(
            db.get_title_info(&key("/animes/1")).unwrap(),
            Some(TitleInfo::new(12, 24))
        );
    }

    #[test]
    fn cached_lookup_does_not_store_failures() {
        let db = Database::open_in_memory().expect("open in-memory db");
        let cached = CachedLookup::new(&db, StaticLookup::new());

        let err = cached.lookup(&key("/animes/9")).unwrap_err();

        assert!(matches!(err, LookupError::NotFound { .. }));
        assert!(db.list_title_info().unwrap().is_empty());
    }

    #[test]
    fn cache_survives_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("wt.db");
        {
            let db = Database::open(&path).unwrap();
            db.put_title_info(&key("/animes/1"), TitleInfo::new(12, 24))
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(
            db.get_title_info(&key("/animes/1")).unwrap(),
            Some(TitleInfo::new(12, 24))
        );
    }
}
