//! Storage layer for the work session tracker.
//!
//! Persists work intervals using `rusqlite` and serves the read-only
//! aggregations in [`aggregate`].
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The tracker owns one connection for writes; every query path opens its own.
//! File databases run in WAL mode with a busy timeout so a reader never blocks
//! the tracker for long.
//!
//! # Schema
//!
//! A single append-mostly `intervals` table keyed by an autoincrementing id.
//! Rows are inserted open (no `end_time`) and closed exactly once.
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`). Every writer uses the same format, so:
//! - Lexicographic ordering matches chronological ordering
//! - Split chains can be followed by exact text equality of `end_time` and `start_time`

pub mod aggregate;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;
use wl_core::split::Segment;
use wl_core::{
    EndReason, Interval, IntervalId, Page, PageRequest, ReasonParseError, StartReason, UtcRange,
    duration_seconds,
};

pub use aggregate::{DayDetail, QueryError, SessionAggregator};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for interval {interval_id}: {timestamp}")]
    TimestampParse {
        interval_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored reason column holds an unknown value.
    #[error("invalid reason for interval {interval_id}")]
    InvalidReason {
        interval_id: i64,
        #[source]
        source: ReasonParseError,
    },
}

/// Result of closing an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The interval was open and is now closed.
    Closed,
    /// The interval was already closed; nothing changed.
    AlreadyClosed,
    /// No interval has this id.
    NotFound,
}

/// Options for [`Database::query_range`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeOptions {
    pub include_open: bool,
}

/// Filter for [`Database::query_page`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageFilter {
    pub include_open: bool,
    /// Only intervals starting inside this range (usually one local day).
    pub day: Option<UtcRange>,
}

/// Row ordering for [`Database::query_page`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recent start first.
    #[default]
    StartDesc,
    /// Highest id first. Kept for callers that paged by insertion order.
    IdDesc,
}

impl SortOrder {
    const fn order_by(self) -> &'static str {
        match self {
            Self::StartDesc => "start_time DESC, id DESC",
            Self::IdDesc => "id DESC",
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

const INTERVAL_COLUMNS: &str =
    "id, start_time, end_time, duration_seconds, start_reason, end_reason";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "opened database");
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
            -- start_time / end_time: RFC 3339 UTC with milliseconds
            -- end_time IS NULL marks the single open interval
            CREATE TABLE IF NOT EXISTS intervals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_seconds INTEGER NOT NULL DEFAULT 0,
                start_reason TEXT NOT NULL DEFAULT 'normal_start',
                end_reason TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_intervals_start ON intervals(start_time);
            CREATE INDEX IF NOT EXISTS idx_intervals_end ON intervals(end_time);
            ",
        )?;
        Ok(())
    }

    /// Inserts a new open interval and returns its id.
    pub fn create_open_interval(
        &mut self,
        start: DateTime<Utc>,
        start_reason: StartReason,
    ) -> Result<IntervalId, DbError> {
        insert_open(&self.conn, start, start_reason)
    }

    /// Closes an open interval.
    ///
    /// The end is clamped to the interval's start, so the stored duration is
    /// never negative. Closing is idempotent: a second call reports
    /// [`CloseOutcome::AlreadyClosed`] and leaves the row untouched.
    pub fn close_interval(
        &mut self,
        id: IntervalId,
        end: DateTime<Utc>,
        end_reason: &EndReason,
    ) -> Result<CloseOutcome, DbError> {
        let tx = self.conn.transaction()?;
        let outcome = close_open(&tx, id, end, end_reason)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Closes `id` with `first` and records each of `continuations` as a
    /// closed [`StartReason::SplitContinuation`] interval.
    ///
    /// Runs in one transaction: either the whole split is stored or nothing
    /// is. Continuations are only written when `id` was still open.
    pub fn close_split(
        &mut self,
        id: IntervalId,
        first: &Segment,
        continuations: &[Segment],
    ) -> Result<CloseOutcome, DbError> {
        let tx = self.conn.transaction()?;
        let outcome = close_open(&tx, id, first.end, &first.end_reason)?;
        if outcome != CloseOutcome::Closed {
            return Ok(outcome);
        }
        for segment in continuations {
            let continuation = insert_open(&tx, segment.start, StartReason::SplitContinuation)?;
            close_open(&tx, continuation, segment.end, &segment.end_reason)?;
        }
        tx.commit()?;
        tracing::debug!(%id, continuations = continuations.len(), "stored split");
        Ok(outcome)
    }

    /// Fetches one interval by id.
    pub fn get_interval(&self, id: IntervalId) -> Result<Option<Interval>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {INTERVAL_COLUMNS} FROM intervals WHERE id = ?"),
                [id.get()],
                IntervalRow::from_row,
            )
            .optional()?;
        row.map(IntervalRow::into_interval).transpose()
    }

    /// Lists intervals that have no end, oldest first.
    ///
    /// More than one only happens when a previous process died mid-session.
    pub fn open_intervals(&self) -> Result<Vec<Interval>, DbError> {
        self.collect(
            &format!(
                "SELECT {INTERVAL_COLUMNS} FROM intervals WHERE end_time IS NULL ORDER BY id ASC"
            ),
            params![],
        )
    }

    /// Lists intervals starting within a range, ordered by start time.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn query_range(
        &self,
        range: UtcRange,
        options: RangeOptions,
    ) -> Result<Vec<Interval>, DbError> {
        if range.end <= range.start {
            return Ok(Vec::new());
        }
        self.collect(
            &format!(
                "
                SELECT {INTERVAL_COLUMNS}
                FROM intervals
                WHERE start_time >= ?1 AND start_time < ?2 AND (?3 OR end_time IS NOT NULL)
                ORDER BY start_time ASC, id ASC
                "
            ),
            params![
                format_timestamp(range.start),
                format_timestamp(range.end),
                options.include_open,
            ],
        )
    }

    /// Returns one page of intervals plus the total matching count.
    pub fn query_page(
        &self,
        filter: PageFilter,
        request: PageRequest,
        order: SortOrder,
    ) -> Result<Page<Interval>, DbError> {
        const WHERE: &str = "
            WHERE (?1 IS NULL OR start_time >= ?1)
              AND (?2 IS NULL OR start_time < ?2)
              AND (?3 OR end_time IS NOT NULL)
        ";
        let day_start = filter.day.map(|day| format_timestamp(day.start));
        let day_end = filter.day.map(|day| format_timestamp(day.end));

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM intervals {WHERE}"),
            params![day_start, day_end, filter.include_open],
            |row| row.get(0),
        )?;

        let data = self.collect(
            &format!(
                "SELECT {INTERVAL_COLUMNS} FROM intervals {WHERE} ORDER BY {} LIMIT ?4 OFFSET ?5",
                order.order_by()
            ),
            params![
                day_start,
                day_end,
                filter.include_open,
                i64::from(request.page_size()),
                i64::try_from(request.offset()).unwrap_or(i64::MAX),
            ],
        )?;

        Ok(Page::new(
            data,
            request,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Lists every interval ordered by start time.
    pub fn list_intervals(&self, include_open: bool) -> Result<Vec<Interval>, DbError> {
        self.collect(
            &format!(
                "
                SELECT {INTERVAL_COLUMNS}
                FROM intervals
                WHERE (?1 OR end_time IS NOT NULL)
                ORDER BY start_time ASC, id ASC
                "
            ),
            params![include_open],
        )
    }

    /// Start time of the earliest stored interval.
    pub fn earliest_start(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let raw: Option<String> =
            self.conn
                .query_row("SELECT MIN(start_time) FROM intervals", [], |row| row.get(0))?;
        raw.map(|raw| parse_timestamp(&raw, 0)).transpose()
    }

    /// Latest start strictly before `instant`.
    pub fn last_start_before(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, DbError> {
        let raw: Option<String> = self.conn.query_row(
            "SELECT MAX(start_time) FROM intervals WHERE start_time < ?",
            [format_timestamp(instant)],
            |row| row.get(0),
        )?;
        raw.map(|raw| parse_timestamp(&raw, 0)).transpose()
    }

    /// Earliest start at or after `instant`.
    pub fn first_start_from(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, DbError> {
        let raw: Option<String> = self.conn.query_row(
            "SELECT MIN(start_time) FROM intervals WHERE start_time >= ?",
            [format_timestamp(instant)],
            |row| row.get(0),
        )?;
        raw.map(|raw| parse_timestamp(&raw, 0)).transpose()
    }

    /// Finds the interval a split continuation starting at `start` was cut from.
    ///
    /// A split closes the earlier piece at 23:59:59 and opens the next one at
    /// 00:00:00, so the source is the most recently created `SplitBoundary`
    /// interval whose end lies within the second before `start`.
    pub fn find_prior_split_source(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Option<Interval>, DbError> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "
                    SELECT {INTERVAL_COLUMNS}
                    FROM intervals
                    WHERE end_reason = ?1 AND end_time >= ?2 AND end_time <= ?3
                    ORDER BY id DESC
                    LIMIT 1
                    "
                ),
                params![
                    EndReason::SplitBoundary.as_str(),
                    format_timestamp(start - TimeDelta::seconds(1)),
                    format_timestamp(start),
                ],
                IntervalRow::from_row,
            )
            .optional()?;
        row.map(IntervalRow::into_interval).transpose()
    }

    fn collect(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Interval>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, IntervalRow::from_row)?;
        let mut intervals = Vec::new();
        for row in rows {
            intervals.push(row?.into_interval()?);
        }
        Ok(intervals)
    }
}

/// Raw column values before parsing.
#[derive(Debug)]
struct IntervalRow {
    id: i64,
    start_time: String,
    end_time: Option<String>,
    duration_seconds: i64,
    start_reason: String,
    end_reason: Option<String>,
}

impl IntervalRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            duration_seconds: row.get(3)?,
            start_reason: row.get(4)?,
            end_reason: row.get(5)?,
        })
    }

    fn into_interval(self) -> Result<Interval, DbError> {
        let id = self.id;
        let invalid_reason = |source| DbError::InvalidReason {
            interval_id: id,
            source,
        };
        Ok(Interval {
            id: IntervalId::new(id),
            start_time: parse_timestamp(&self.start_time, id)?,
            end_time: self
                .end_time
                .as_deref()
                .map(|raw| parse_timestamp(raw, id))
                .transpose()?,
            duration_seconds: self.duration_seconds.max(0),
            start_reason: self.start_reason.parse().map_err(invalid_reason)?,
            end_reason: self
                .end_reason
                .as_deref()
                .filter(|raw| !raw.is_empty())
                .map(str::parse)
                .transpose()
                .map_err(invalid_reason)?,
        })
    }
}

fn insert_open(
    conn: &Connection,
    start: DateTime<Utc>,
    start_reason: StartReason,
) -> Result<IntervalId, DbError> {
    conn.execute(
        "INSERT INTO intervals (start_time, start_reason) VALUES (?, ?)",
        params![format_timestamp(start), start_reason.as_str()],
    )?;
    let id = IntervalId::new(conn.last_insert_rowid());
    tracing::debug!(%id, %start, %start_reason, "opened interval");
    Ok(id)
}

/// Sets the end of `id` if it is still open. Callers own the transaction.
fn close_open(
    conn: &Connection,
    id: IntervalId,
    end: DateTime<Utc>,
    end_reason: &EndReason,
) -> Result<CloseOutcome, DbError> {
    let existing: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT start_time, end_time FROM intervals WHERE id = ?",
            [id.get()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((start_raw, end_raw)) = existing else {
        tracing::warn!(%id, "close requested for unknown interval");
        return Ok(CloseOutcome::NotFound);
    };
    if end_raw.is_some() {
        tracing::debug!(%id, "interval already closed");
        return Ok(CloseOutcome::AlreadyClosed);
    }

    let start = parse_timestamp(&start_raw, id.get())?;
    let end = end.max(start);
    conn.execute(
        "
        UPDATE intervals
        SET end_time = ?, end_reason = ?, duration_seconds = ?
        WHERE id = ? AND end_time IS NULL
        ",
        params![
            format_timestamp(end),
            end_reason.as_str(),
            duration_seconds(start, end),
            id.get(),
        ],
    )?;
    tracing::debug!(%id, %end, %end_reason, "closed interval");
    Ok(CloseOutcome::Closed)
}

fn parse_timestamp(timestamp: &str, interval_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            interval_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
