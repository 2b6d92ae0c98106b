//! UI-facing records derived from stored intervals.
//!
//! A split session is stored as several intervals. These views put each
//! boundary into the slot that names what happened there (check-in, shift
//! out at midnight, shift in after midnight, checkout) and tag the row so a
//! renderer can draw the bracket joining the halves.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Serialize, Serializer};

use crate::calendar::Calendar;
use crate::format::{self, PLACEHOLDER};
use crate::interval::Interval;

/// Which half of a split a displayed row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftTag {
    /// Continues from the previous day.
    In,
    /// Continues into the next day.
    Out,
    /// Both: a whole day inside a multi-day session.
    InOut,
}

impl ShiftTag {
    #[must_use]
    pub const fn from_flags(shift_in: bool, shift_out: bool) -> Option<Self> {
        match (shift_in, shift_out) {
            (true, true) => Some(Self::InOut),
            (true, false) => Some(Self::In),
            (false, true) => Some(Self::Out),
            (false, false) => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::InOut => "in-out",
        }
    }
}

impl Serialize for ShiftTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A display slot: formatted text plus the exact instant when populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub display: String,
    pub iso: Option<String>,
}

impl TimeSlot {
    pub fn empty() -> Self {
        Self {
            display: PLACEHOLDER.to_string(),
            iso: None,
        }
    }

    pub fn at<Tz: TimeZone>(calendar: &Calendar<Tz>, instant: DateTime<Utc>) -> Self {
        let local = calendar.localize(instant);
        Self {
            display: format::format_slot(&local),
            iso: Some(local.to_rfc3339()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iso.is_none()
    }
}

/// One row of the session grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub id: i64,
    pub check_in: TimeSlot,
    pub shift_out: TimeSlot,
    pub shift_in: TimeSlot,
    pub checkout: TimeSlot,
    pub duration: String,
    pub duration_seconds: i64,
    pub shift_tag: Option<ShiftTag>,
    pub is_open: bool,
}

/// Maps an interval onto the four grid slots.
pub fn session_row<Tz: TimeZone>(calendar: &Calendar<Tz>, interval: &Interval) -> SessionRow {
    let continuation = interval.is_split_continuation();
    let boundary = interval.ends_at_split_boundary();
    let slot = |instant| TimeSlot::at(calendar, instant);

    let check_in = if continuation {
        TimeSlot::empty()
    } else {
        slot(interval.start_time)
    };
    let shift_in = if continuation {
        slot(interval.start_time)
    } else {
        TimeSlot::empty()
    };
    let (shift_out, checkout) = match interval.end_time {
        Some(end) if boundary => (slot(end), TimeSlot::empty()),
        Some(end) => (TimeSlot::empty(), slot(end)),
        None => (TimeSlot::empty(), TimeSlot::empty()),
    };

    SessionRow {
        id: interval.id.get(),
        check_in,
        shift_out,
        shift_in,
        checkout,
        duration: format::format_hours_minutes(interval.duration_seconds),
        duration_seconds: interval.duration_seconds,
        shift_tag: ShiftTag::from_flags(continuation, boundary),
        is_open: interval.is_open(),
    }
}

/// Dashboard card for the current day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodaySummary {
    pub date: String,
    pub total_seconds: i64,
    pub total_duration: String,
    pub session_count: usize,
    pub first_check_in: String,
    pub latest_check_out: String,
}

/// One bar of the weekly chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub axis_label: String,
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSummary {
    pub week_start: NaiveDate,
    pub total_seconds: i64,
    pub total_duration: String,
    pub chart_data: Vec<ChartPoint>,
    pub is_latest_week: bool,
    pub is_first_week: bool,
}

/// Aggregate for one calendar day that has data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date_iso: String,
    pub date: String,
    pub day: String,
    pub total_seconds: i64,
    pub total_duration: String,
    pub session_count: usize,
    pub shift_tag: Option<ShiftTag>,
}

impl DaySummary {
    /// Summarizes the intervals of one day, given in start order.
    pub fn from_intervals(date: NaiveDate, intervals: &[Interval]) -> Self {
        let total_seconds = intervals.iter().map(|i| i.duration_seconds).sum();
        let shift_in = intervals.first().is_some_and(Interval::is_split_continuation);
        let shift_out = intervals.last().is_some_and(Interval::ends_at_split_boundary);
        Self {
            date_iso: date.format("%Y-%m-%d").to_string(),
            date: format::format_day(date),
            day: date.format("%A").to_string(),
            total_seconds,
            total_duration: format::format_hours_minutes(total_seconds),
            session_count: count_sessions(intervals),
            shift_tag: ShiftTag::from_flags(shift_in, shift_out),
        }
    }
}

/// Number of logical sessions: continuation halves are not counted again.
pub fn count_sessions(intervals: &[Interval]) -> usize {
    intervals
        .iter()
        .filter(|interval| !interval.is_split_continuation())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::IntervalId;
    use crate::reason::{EndReason, StartReason};

    fn utc(d: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, h, m, s).unwrap()
    }

    fn interval(
        id: i64,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        start_reason: StartReason,
        end_reason: Option<EndReason>,
    ) -> Interval {
        Interval {
            id: IntervalId::new(id),
            start_time: start,
            end_time: end,
            duration_seconds: end.map_or(0, |end| crate::interval::duration_seconds(start, end)),
            start_reason,
            end_reason,
        }
    }

    #[test]
    fn plain_session_fills_check_in_and_checkout() {
        let calendar = Calendar::new(Utc);
        let row = session_row(
            &calendar,
            &interval(
                1,
                utc(9, 9, 0, 0),
                Some(utc(9, 11, 30, 0)),
                StartReason::NormalStart,
                Some(EndReason::Lock),
            ),
        );
        assert_eq!(row.check_in.display, "9 Jan, 25 - 09:00");
        assert_eq!(row.checkout.display, "9 Jan, 25 - 11:30");
        assert!(row.shift_in.is_empty());
        assert!(row.shift_out.is_empty());
        assert_eq!(row.duration, "2h 30m");
        assert_eq!(row.shift_tag, None);
    }

    #[test]
    fn split_halves_use_shift_slots() {
        let calendar = Calendar::new(Utc);
        let first = session_row(
            &calendar,
            &interval(
                1,
                utc(9, 22, 0, 0),
                Some(utc(9, 23, 59, 59)),
                StartReason::NormalStart,
                Some(EndReason::SplitBoundary),
            ),
        );
        assert!(!first.check_in.is_empty());
        assert_eq!(first.shift_out.display, "9 Jan, 25 - 23:59");
        assert!(first.checkout.is_empty());
        assert_eq!(first.shift_tag, Some(ShiftTag::Out));

        let second = session_row(
            &calendar,
            &interval(
                2,
                utc(10, 0, 0, 0),
                Some(utc(10, 1, 0, 0)),
                StartReason::SplitContinuation,
                Some(EndReason::NormalEnd),
            ),
        );
        assert_eq!(second.check_in.display, PLACEHOLDER);
        assert_eq!(second.shift_in.display, "10 Jan, 25 - 00:00");
        assert_eq!(second.checkout.display, "10 Jan, 25 - 01:00");
        assert_eq!(second.shift_tag, Some(ShiftTag::In));
    }

    #[test]
    fn middle_of_chain_is_in_out() {
        let calendar = Calendar::new(Utc);
        let row = session_row(
            &calendar,
            &interval(
                3,
                utc(10, 0, 0, 0),
                Some(utc(10, 23, 59, 59)),
                StartReason::SplitContinuation,
                Some(EndReason::SplitBoundary),
            ),
        );
        assert_eq!(row.shift_tag, Some(ShiftTag::InOut));
        assert!(row.check_in.is_empty());
        assert!(row.checkout.is_empty());
    }

    #[test]
    fn open_interval_has_no_end_slots() {
        let calendar = Calendar::new(Utc);
        let row = session_row(
            &calendar,
            &interval(4, utc(9, 9, 0, 0), None, StartReason::NormalStart, None),
        );
        assert!(row.is_open);
        assert!(row.checkout.is_empty());
        assert!(row.shift_out.is_empty());
        assert_eq!(row.duration, "0h 0m");
    }

    #[test]
    fn shift_tag_serializes_as_text() {
        let json = serde_json::to_string(&ShiftTag::InOut).unwrap();
        insta::assert_snapshot!(json, @r#""in-out""#);
    }

    #[test]
    fn day_summary_counts_sessions_not_halves() {
        let intervals = vec![
            interval(
                2,
                utc(10, 0, 0, 0),
                Some(utc(10, 0, 30, 0)),
                StartReason::SplitContinuation,
                Some(EndReason::NormalEnd),
            ),
            interval(
                3,
                utc(10, 9, 0, 0),
                Some(utc(10, 10, 0, 0)),
                StartReason::NormalStart,
                Some(EndReason::Lock),
            ),
        ];
        let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let summary = DaySummary::from_intervals(day, &intervals);
        assert_eq!(summary.session_count, 1);
        assert_eq!(summary.total_seconds, 5_400);
        assert_eq!(summary.total_duration, "1h 30m");
        assert_eq!(summary.shift_tag, Some(ShiftTag::In));
        assert_eq!(summary.date_iso, "2025-01-10");
        assert_eq!(summary.day, "Friday");
    }
}
