//! SQLite-based interval storage.
//!
//! Provides persistent storage for:
//! - Interval records and their lifecycle state
//! - Per-category summaries computed in SQL
//!
//! Durations are stored in milliseconds. Timestamps are stored as RFC 3339
//! with millisecond precision and a `Z` suffix so that range filters can
//! compare them as text.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::data_dir;
use super::repository::Repository;
use crate::error::RepositoryError;
use crate::stats::{CategoryStats, CategorySummary, DateRange};
use crate::timer::{Category, Interval, IntervalId, IntervalState};

/// SQLite-backed [`Repository`].
///
/// The connection sits behind a mutex so the store can be shared between
/// concurrently driven intervals.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

const COLUMNS: &str = "id, category, state, planned_ms, actual_ms, start_time, lease";

const SET_COLUMNS: &str = "category = ?2, state = ?3, planned_ms = ?4, actual_ms = ?5,
                 start_time = ?6, lease = ?7";

impl SqliteRepository {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path).map_err(|source| RepositoryError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open the database at `~/.config/pomo/pomo.db`.
    pub fn open_default() -> Result<Self, RepositoryError> {
        let path = data_dir()?.join("pomo.db");
        Self::open(&path)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, RepositoryError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, RepositoryError> {
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS intervals (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            category    TEXT NOT NULL,
            state       TEXT NOT NULL,
            planned_ms  INTEGER NOT NULL,
            actual_ms   INTEGER NOT NULL DEFAULT 0,
            start_time  TEXT,
            lease       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_intervals_start_time ON intervals(start_time);
        CREATE INDEX IF NOT EXISTS idx_intervals_category_start_time
            ON intervals(category, start_time);",
    )
}

fn to_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn from_ms(ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(ms).unwrap_or(0))
}

fn to_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Raw column values; decoded outside the rusqlite row closure so that a
/// bad value surfaces as [`RepositoryError::Corrupt`].
struct RawInterval {
    id: IntervalId,
    category: String,
    state: String,
    planned_ms: i64,
    actual_ms: i64,
    start_time: Option<String>,
    lease: Option<String>,
}

impl RawInterval {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category: row.get(1)?,
            state: row.get(2)?,
            planned_ms: row.get(3)?,
            actual_ms: row.get(4)?,
            start_time: row.get(5)?,
            lease: row.get(6)?,
        })
    }

    fn decode(self) -> Result<Interval, RepositoryError> {
        let id = self.id;
        let corrupt = |message: String| RepositoryError::Corrupt { id, message };
        let start_time = self
            .start_time
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|t| t.with_timezone(&Utc)))
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;
        let lease = self
            .lease
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;
        Ok(Interval {
            id,
            category: self.category.parse().map_err(corrupt)?,
            state: self.state.parse().map_err(corrupt)?,
            planned_duration: from_ms(self.planned_ms),
            actual_duration: from_ms(self.actual_ms),
            start_time,
            lease,
        })
    }
}

impl Repository for SqliteRepository {
    fn create(&self, interval: &Interval) -> Result<IntervalId, RepositoryError> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO intervals (category, state, planned_ms, actual_ms, start_time, lease)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                interval.category.as_str(),
                interval.state.as_str(),
                to_ms(interval.planned_duration),
                to_ms(interval.actual_duration),
                interval.start_time.map(to_text),
                interval.lease.map(|l| l.to_string()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, interval: &Interval) -> Result<(), RepositoryError> {
        let conn = self.conn.lock()?;
        let changed = conn.execute(
            &format!("UPDATE intervals SET {SET_COLUMNS} WHERE id = ?1"),
            params![
                interval.id,
                interval.category.as_str(),
                interval.state.as_str(),
                to_ms(interval.planned_duration),
                to_ms(interval.actual_duration),
                interval.start_time.map(to_text),
                interval.lease.map(|l| l.to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(interval.id));
        }
        Ok(())
    }

    fn update_if(
        &self,
        interval: &Interval,
        expected_state: IntervalState,
        expected_lease: Option<Uuid>,
    ) -> Result<bool, RepositoryError> {
        let conn = self.conn.lock()?;
        let changed = conn.execute(
            &format!(
                "UPDATE intervals SET {SET_COLUMNS}
                 WHERE id = ?1 AND state = ?8 AND lease IS ?9"
            ),
            params![
                interval.id,
                interval.category.as_str(),
                interval.state.as_str(),
                to_ms(interval.planned_duration),
                to_ms(interval.actual_duration),
                interval.start_time.map(to_text),
                interval.lease.map(|l| l.to_string()),
                expected_state.as_str(),
                expected_lease.map(|l| l.to_string()),
            ],
        )?;
        if changed > 0 {
            return Ok(true);
        }
        let exists = conn
            .query_row(
                "SELECT 1 FROM intervals WHERE id = ?1",
                params![interval.id],
                |_| Ok(()),
            )
            .optional()?;
        match exists {
            Some(()) => Ok(false),
            None => Err(RepositoryError::NotFound(interval.id)),
        }
    }

    fn by_id(&self, id: IntervalId) -> Result<Interval, RepositoryError> {
        let conn = self.conn.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM intervals WHERE id = ?1"),
                params![id],
                RawInterval::from_row,
            )
            .optional()?
            .ok_or(RepositoryError::NotFound(id))?;
        raw.decode()
    }

    fn last(&self) -> Result<Interval, RepositoryError> {
        let conn = self.conn.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM intervals ORDER BY id DESC LIMIT 1"),
                [],
                RawInterval::from_row,
            )
            .optional()?
            .ok_or(RepositoryError::NoIntervals)?;
        raw.decode()
    }

    fn count(&self) -> Result<u64, RepositoryError> {
        let conn = self.conn.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM intervals", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    fn list(&self) -> Result<Vec<Interval>, RepositoryError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM intervals ORDER BY id"))?;
        let rows = stmt.query_map([], RawInterval::from_row)?;
        let mut intervals = Vec::new();
        for row in rows {
            intervals.push(row?.decode()?);
        }
        Ok(intervals)
    }

    fn category_summary(
        &self,
        range: Option<&DateRange>,
    ) -> Result<CategorySummary, RepositoryError> {
        let range = range.copied().unwrap_or_default();
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*), COALESCE(SUM(actual_ms), 0)
             FROM intervals
             WHERE start_time IS NOT NULL
               AND (?1 IS NULL OR start_time >= ?1)
               AND (?2 IS NULL OR start_time < ?2)
             GROUP BY category",
        )?;
        let rows = stmt.query_map(
            params![range.from.map(to_text), range.to.map(to_text)],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;

        let mut summary = CategorySummary::default();
        for row in rows {
            let (category, count, total_ms) = row?;
            let category: Category = category
                .parse()
                .map_err(RepositoryError::QueryFailed)?;
            summary.categories.insert(
                category,
                CategoryStats {
                    count: u64::try_from(count).unwrap_or(0),
                    total: from_ms(total_ms),
                },
            );
        }
        Ok(summary)
    }
}
