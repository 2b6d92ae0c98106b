//! Read-only views over stored intervals.
//!
//! Every query here maps raw intervals to what a dashboard shows: today's
//! card, a weekly chart, the session grid, per-day summaries and day detail.
//! Days are local calendar days of the configured [`Calendar`]. Intervals are
//! bucketed by the local date of their start; open intervals are included with
//! their zero stored duration.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc, Weekday};
use serde::Serialize;
use thiserror::Error;
use wl_core::calendar::week_start_of;
use wl_core::format::{self, PLACEHOLDER};
use wl_core::view::{count_sessions, session_row};
use wl_core::{
    Calendar, ChartPoint, DaySummary, Interval, Page, PageRequest, SessionRow, TodaySummary,
    WeekSummary,
};

use crate::{Database, DbError, PageFilter, RangeOptions, SortOrder};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors surfaced by aggregator queries.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid date {input:?}, expected YYYY-MM-DD")]
    InvalidDate {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("page size must be at least 1")]
    InvalidPageSize,
}

/// One day's summary plus a page of its sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayDetail {
    pub summary: DaySummary,
    pub sessions: Page<SessionRow>,
    /// Nearest earlier day with data, as `YYYY-MM-DD`.
    pub previous_day: Option<String>,
    /// Nearest later day with data, as `YYYY-MM-DD`.
    pub next_day: Option<String>,
}

/// Query layer over a [`Database`].
pub struct SessionAggregator<'a, Tz: TimeZone> {
    db: &'a Database,
    calendar: Calendar<Tz>,
    week_start: Weekday,
}

impl<'a, Tz: TimeZone> SessionAggregator<'a, Tz> {
    /// Creates an aggregator with weeks starting on Sunday.
    pub const fn new(db: &'a Database, calendar: Calendar<Tz>) -> Self {
        Self {
            db,
            calendar,
            week_start: Weekday::Sun,
        }
    }

    #[must_use]
    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    /// Totals for the local day containing `now`.
    pub fn today_summary(&self, now: DateTime<Utc>) -> Result<TodaySummary, QueryError> {
        let today = self.calendar.date_of(now);
        let intervals = self.db.query_range(
            self.calendar.day_range(today),
            RangeOptions { include_open: true },
        )?;

        let total_seconds = intervals.iter().map(|i| i.duration_seconds).sum();
        let first_check_in = intervals.first().map_or_else(
            || PLACEHOLDER.to_string(),
            |first| format::format_time_of_day(&self.calendar.localize(first.start_time)),
        );
        let latest_check_out = intervals
            .last()
            .and_then(|last| last.end_time)
            .map_or_else(
                || PLACEHOLDER.to_string(),
                |end| format::format_time_of_day(&self.calendar.localize(end)),
            );

        Ok(TodaySummary {
            date: today.format(DATE_FORMAT).to_string(),
            total_seconds,
            total_duration: format::format_hours_minutes(total_seconds),
            session_count: count_sessions(&intervals),
            first_check_in,
            latest_check_out,
        })
    }

    /// Seven-day chart for the week containing `now`, shifted by `offset` weeks.
    ///
    /// A negative offset moves into the past.
    pub fn week_summary(
        &self,
        now: DateTime<Utc>,
        offset: i32,
    ) -> Result<WeekSummary, QueryError> {
        let current = week_start_of(self.calendar.date_of(now), self.week_start);
        let first = current
            .checked_add_signed(TimeDelta::weeks(i64::from(offset)))
            .unwrap_or(current);
        let range = self.calendar.days_range(first, 7);

        let intervals = self
            .db
            .query_range(range, RangeOptions { include_open: true })?;
        let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for interval in &intervals {
            *per_day
                .entry(self.calendar.date_of(interval.start_time))
                .or_default() += interval.duration_seconds;
        }

        let chart_data = first
            .iter_days()
            .take(7)
            .map(|date| {
                let seconds = per_day.get(&date).copied().unwrap_or_default();
                ChartPoint {
                    axis_label: date.format("%a").to_string(),
                    value: format::hours_one_decimal(seconds),
                    label: format::format_hours_minutes(seconds),
                }
            })
            .collect();
        let total_seconds = per_day.values().sum();

        let is_first_week = self
            .db
            .earliest_start()?
            .is_none_or(|earliest| earliest >= range.start);

        Ok(WeekSummary {
            week_start: first,
            total_seconds,
            total_duration: format::format_hours_minutes(total_seconds),
            chart_data,
            is_latest_week: range.end > now,
            is_first_week,
        })
    }

    /// Session grid, newest first, optionally limited to one local day.
    pub fn sessions_page(
        &self,
        page: u32,
        page_size: u32,
        include_active: bool,
        date: Option<&str>,
    ) -> Result<Page<SessionRow>, QueryError> {
        let request = page_request(page, page_size)?;
        let day = date
            .map(parse_date)
            .transpose()?
            .map(|date| self.calendar.day_range(date));
        let filter = PageFilter {
            include_open: include_active,
            day,
        };
        let intervals = self.db.query_page(filter, request, SortOrder::StartDesc)?;
        Ok(intervals.map(|interval| session_row(&self.calendar, &interval)))
    }

    /// Distinct days with data, newest first.
    pub fn daily_summaries_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Page<DaySummary>, QueryError> {
        let request = page_request(page, page_size)?;
        let mut by_day: BTreeMap<NaiveDate, Vec<Interval>> = BTreeMap::new();
        for interval in self.db.list_intervals(true)? {
            by_day
                .entry(self.calendar.date_of(interval.start_time))
                .or_default()
                .push(interval);
        }
        let days = by_day
            .iter()
            .rev()
            .map(|(date, intervals)| DaySummary::from_intervals(*date, intervals))
            .collect();
        Ok(Page::from_all(days, request))
    }

    /// Summary and sessions of one day.
    ///
    /// Returns `Ok(None)` when the day has no intervals.
    pub fn day_detail(
        &self,
        date_iso: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Option<DayDetail>, QueryError> {
        let date = parse_date(date_iso)?;
        let request = page_request(page, page_size)?;
        let range = self.calendar.day_range(date);

        let intervals = self
            .db
            .query_range(range, RangeOptions { include_open: true })?;
        if intervals.is_empty() {
            tracing::debug!(%date, "no data for day");
            return Ok(None);
        }

        let sessions = self
            .db
            .query_page(
                PageFilter {
                    include_open: true,
                    day: Some(range),
                },
                request,
                SortOrder::StartDesc,
            )?
            .map(|interval| session_row(&self.calendar, &interval));

        let previous_day = self
            .db
            .last_start_before(range.start)?
            .map(|start| self.iso_date(start));
        let next_day = self
            .db
            .first_start_from(range.end)?
            .map(|start| self.iso_date(start));

        Ok(Some(DayDetail {
            summary: DaySummary::from_intervals(date, &intervals),
            sessions,
            previous_day,
            next_day,
        }))
    }

    fn iso_date(&self, instant: DateTime<Utc>) -> String {
        self.calendar
            .date_of(instant)
            .format(DATE_FORMAT)
            .to_string()
    }
}

fn page_request(page: u32, page_size: u32) -> Result<PageRequest, QueryError> {
    PageRequest::new(page, page_size).ok_or(QueryError::InvalidPageSize)
}

fn parse_date(input: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|source| QueryError::InvalidDate {
        input: input.to_string(),
        source,
    })
}
