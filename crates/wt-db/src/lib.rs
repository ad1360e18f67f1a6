//! Storage layer for the window-time tracker.
//!
//! Persists closed activities and settings using `rusqlite`, and answers the
//! range and aggregate queries used by reports.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The tracker loop owns one `Database` and is the only writer; reporting code
//! opens its own `Database` on the same file and only reads. SQLite's default
//! locking makes every committed insert visible to reads that start after it.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`). The fixed width keeps lexicographic
//! ordering identical to chronological ordering, so range filters run on the
//! `start_time` index.
//!
//! ## Range Convention
//!
//! Every range query selects activities whose `start_time` lies in the
//! half-open interval `[start, end)`. An activity is attributed entirely to
//! the range (and hour/day bucket) containing its start.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Local, SecondsFormat, TimeZone, Timelike, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use wt_core::{Activity, ActivityId, ActivitySink, Segment};

const SECONDS_PER_DAY: i64 = 86_400;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp for activity {activity_id}: {timestamp}")]
    TimestampParse {
        activity_id: i64,
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

/// A persisted setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingRecord {
    pub key: String,
    pub value: String,
    pub updated_at: String,
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
            -- Activities: closed, immutable time segments
            -- start_time/end_time: RFC 3339 UTC, millisecond precision
            -- enriched_name: classifier label, NULL for idle rows
            CREATE TABLE IF NOT EXISTS activities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                app_name TEXT NOT NULL,
                enriched_name TEXT,
                window_title TEXT NOT NULL DEFAULT '',
                process_path TEXT NOT NULL DEFAULT '',
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                duration_seconds INTEGER NOT NULL CHECK (duration_seconds >= 0),
                is_idle INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                CHECK (end_time > start_time)
            );

            CREATE INDEX IF NOT EXISTS idx_activities_start_time ON activities(start_time);
            CREATE INDEX IF NOT EXISTS idx_activities_app_name ON activities(app_name);
            CREATE INDEX IF NOT EXISTS idx_activities_enriched_name ON activities(enriched_name);

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Appends one closed segment and returns its new identifier.
    pub fn insert_activity(&mut self, segment: &Segment) -> Result<ActivityId, DbError> {
        self.conn.execute(
            "
            INSERT INTO activities
            (app_name, enriched_name, window_title, process_path, start_time, end_time, duration_seconds, is_idle, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                segment.app_name(),
                segment.enriched_name(),
                segment.window_title(),
                segment.process_path(),
                format_timestamp(segment.start_time()),
                format_timestamp(segment.end_time()),
                segment.duration_seconds(),
                segment.is_idle(),
                format_timestamp(Utc::now()),
            ],
        )?;
        Ok(ActivityId::new(self.conn.last_insert_rowid()))
    }

    /// Lists activities starting within `[start, end)`, most recent first.
    pub fn activities_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Activity>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, app_name, enriched_name, window_title, process_path, start_time, end_time, duration_seconds, is_idle
            FROM activities
            WHERE start_time >= ? AND start_time < ?
            ORDER BY start_time DESC, id DESC
            ",
        )?;
        let rows = stmt.query_map(
            [format_timestamp(start), format_timestamp(end)],
            ActivityRow::from_row,
        )?;
        let mut activities = Vec::new();
        for row in rows {
            activities.push(row?.into_activity()?);
        }
        Ok(activities)
    }

    /// Returns the most recently started activity.
    pub fn latest_activity(&self) -> Result<Option<Activity>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, app_name, enriched_name, window_title, process_path, start_time, end_time, duration_seconds, is_idle
                FROM activities
                ORDER BY start_time DESC, id DESC
                LIMIT 1
                ",
                [],
                ActivityRow::from_row,
            )
            .optional()?;
        row.map(ActivityRow::into_activity).transpose()
    }

    /// Counts all stored activities.
    pub fn activity_count(&self) -> Result<i64, DbError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Total non-idle seconds per app name for activities in `[start, end)`.
    pub fn stats_by_label(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BTreeMap<String, i64>, DbError> {
        let mut stats = BTreeMap::new();
        if end <= start {
            return Ok(stats);
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT app_name, SUM(duration_seconds) AS total_duration
            FROM activities
            WHERE start_time >= ? AND start_time < ? AND is_idle = 0
            GROUP BY app_name
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(start), format_timestamp(end)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (app_name, seconds) = row?;
            stats.insert(app_name, seconds);
        }
        Ok(stats)
    }

    /// Total idle seconds for activities in `[start, end)`.
    pub fn idle_seconds(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64, DbError> {
        if end <= start {
            return Ok(0);
        }
        let seconds = self.conn.query_row(
            "
            SELECT COALESCE(SUM(duration_seconds), 0)
            FROM activities
            WHERE start_time >= ? AND start_time < ? AND is_idle = 1
            ",
            [format_timestamp(start), format_timestamp(end)],
            |row| row.get(0),
        )?;
        Ok(seconds)
    }

    /// Non-idle seconds per local hour of day (index 0-23).
    pub fn hourly_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<[i64; 24], DbError> {
        self.hourly_stats_in(start, end, &Local)
    }

    /// Non-idle seconds per hour of day in the given time zone.
    pub fn hourly_stats_in<Tz: TimeZone>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<[i64; 24], DbError> {
        let mut hours = [0_i64; 24];
        for (start_time, seconds) in self.active_durations(start, end)? {
            let hour = start_time.with_timezone(tz).hour() as usize;
            hours[hour] += seconds;
        }
        Ok(hours)
    }

    /// Non-idle seconds per local calendar day; index 0 is the day of `start`.
    pub fn daily_stats(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<i64>, DbError> {
        self.daily_stats_in(start, end, &Local)
    }

    /// Non-idle seconds per calendar day in the given time zone.
    ///
    /// The result has `ceil(days spanned)` entries, at least one. Days are
    /// counted on local wall-clock time so a week spanning a DST change still
    /// has seven entries.
    pub fn daily_stats_in<Tz: TimeZone>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<Vec<i64>, DbError> {
        let local_start = start.with_timezone(tz).naive_local();
        let local_end = end.with_timezone(tz).naive_local();
        let span_seconds = (local_end - local_start).num_seconds();
        let day_count = if span_seconds <= 0 {
            1
        } else {
            (span_seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
        };

        let mut days = vec![0_i64; usize::try_from(day_count).unwrap_or(1)];
        let first_day = local_start.date();
        for (start_time, seconds) in self.active_durations(start, end)? {
            let day = start_time.with_timezone(tz).date_naive();
            let index = (day - first_day).num_days();
            if let Some(total) = usize::try_from(index).ok().and_then(|i| days.get_mut(i)) {
                *total += seconds;
            }
        }
        Ok(days)
    }

    /// Non-idle seconds grouped by app name, then by enriched label.
    ///
    /// Rows without an enriched name are grouped under their app name.
    pub fn grouped_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BTreeMap<String, BTreeMap<String, i64>>, DbError> {
        let mut grouped: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
        if end <= start {
            return Ok(grouped);
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT
                app_name,
                COALESCE(NULLIF(enriched_name, ''), app_name) AS label,
                SUM(duration_seconds) AS total_duration
            FROM activities
            WHERE start_time >= ? AND start_time < ? AND is_idle = 0
            GROUP BY app_name, label
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(start), format_timestamp(end)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        for row in rows {
            let (app_name, label, seconds) = row?;
            grouped.entry(app_name).or_default().insert(label, seconds);
        }
        Ok(grouped)
    }

    /// Recomputes `enriched_name` for every non-idle activity.
    ///
    /// Returns the number of rows whose label changed; running it twice with
    /// the same classifier changes nothing the second time.
    pub fn rewrite_enriched_names<F>(&mut self, classify: F) -> Result<usize, DbError>
    where
        F: Fn(&str, &str) -> String,
    {
        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut select = tx.prepare(
                "SELECT id, app_name, window_title FROM activities WHERE is_idle = 0 ORDER BY id ASC",
            )?;
            let mut update = tx.prepare(
                "UPDATE activities SET enriched_name = ?1 WHERE id = ?2 AND enriched_name IS NOT ?1",
            )?;
            let rows = select.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            for row in rows {
                let (id, app_name, window_title) = row?;
                let label = classify(&app_name, &window_title);
                updated += update.execute(params![label, id])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    /// Reads a setting.
    pub fn setting(&self, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Writes a setting; the last write for a key wins.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
            params![key, value, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }

    /// Removes a setting. Returns `true` if the key existed.
    pub fn delete_setting(&mut self, key: &str) -> Result<bool, DbError> {
        let removed = self.conn.execute("DELETE FROM settings WHERE key = ?", [key])?;
        Ok(removed > 0)
    }

    /// Lists all settings ordered by key.
    pub fn list_settings(&self) -> Result<Vec<SettingRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM settings ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(SettingRecord {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;
        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }
        Ok(settings)
    }

    /// Start time and duration of non-idle activities in `[start, end)`.
    fn active_durations(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, i64)>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, start_time, duration_seconds
            FROM activities
            WHERE start_time >= ? AND start_time < ? AND is_idle = 0
            ORDER BY start_time ASC
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(start), format_timestamp(end)], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        let mut durations = Vec::new();
        for row in rows {
            let (id, start_time, seconds) = row?;
            durations.push((parse_timestamp(&start_time, id)?, seconds));
        }
        Ok(durations)
    }
}

impl ActivitySink for Database {
    type Error = DbError;

    fn record(&mut self, segment: &Segment) -> Result<ActivityId, Self::Error> {
        self.insert_activity(segment)
    }
}

/// Raw activity row, before timestamp parsing.
#[derive(Debug)]
struct ActivityRow {
    id: i64,
    app_name: String,
    enriched_name: Option<String>,
    window_title: String,
    process_path: String,
    start_time: String,
    end_time: String,
    duration_seconds: i64,
    is_idle: bool,
}

impl ActivityRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            app_name: row.get(1)?,
            enriched_name: row.get(2)?,
            window_title: row.get(3)?,
            process_path: row.get(4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            duration_seconds: row.get(7)?,
            is_idle: row.get(8)?,
        })
    }

    fn into_activity(self) -> Result<Activity, DbError> {
        Ok(Activity {
            id: ActivityId::new(self.id),
            start_time: parse_timestamp(&self.start_time, self.id)?,
            end_time: parse_timestamp(&self.end_time, self.id)?,
            app_name: self.app_name,
            enriched_name: self.enriched_name,
            window_title: self.window_title,
            process_path: self.process_path,
            duration_seconds: self.duration_seconds,
            is_idle: self.is_idle,
        })
    }
}

fn parse_timestamp(timestamp: &str, activity_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            activity_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
