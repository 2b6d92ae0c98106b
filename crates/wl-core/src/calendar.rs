//! Calendar-day arithmetic in a chosen time zone.
//!
//! Sessions are stored as UTC instants but split, bucketed and filtered by
//! the user's local calendar day. [`Calendar`] owns that mapping so the same
//! code runs against `chrono::Local` in production and fixed offsets in tests.

use chrono::{
    DateTime, Datelike, Days, FixedOffset, Local, NaiveDate, Offset, TimeDelta, TimeZone, Utc,
    Weekday,
};

/// Half-open UTC range `[start, end)` covering one or more local days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UtcRange {
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

#[derive(Debug, Clone)]
pub struct Calendar<Tz: TimeZone> {
    tz: Tz,
}

impl Calendar<Local> {
    /// Calendar in the system's local time zone.
    #[must_use]
    pub const fn local() -> Self {
        Self { tz: Local }
    }
}

impl<Tz: TimeZone> Calendar<Tz> {
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Local calendar date of an instant.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// The instant rendered with its local UTC offset.
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        let offset = instant.with_timezone(&self.tz).offset().fix();
        instant.with_timezone(&offset)
    }

    /// First instant of a local date.
    ///
    /// Ambiguous midnights (DST fall-back) resolve to the earlier instant.
    /// When midnight falls in a DST gap the first existing hour is used.
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        for hour in 0..3 {
            let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            if let Some(local) = self.tz.from_local_datetime(&naive).earliest() {
                return local.with_timezone(&Utc);
            }
        }
        // No zone skips three hours; fall back to reading the date as UTC.
        date.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Last whole second of a local date (23:59:59).
    pub fn day_end(&self, date: NaiveDate) -> DateTime<Utc> {
        self.day_start(next_day(date)) - TimeDelta::seconds(1)
    }

    /// Half-open range covering a single local date.
    pub fn day_range(&self, date: NaiveDate) -> UtcRange {
        UtcRange {
            start: self.day_start(date),
            end: self.day_start(next_day(date)),
        }
    }

    /// Half-open range covering `days` local dates starting at `first`.
    pub fn days_range(&self, first: NaiveDate, days: u64) -> UtcRange {
        let last = first.checked_add_days(Days::new(days)).unwrap_or(first);
        UtcRange {
            start: self.day_start(first),
            end: self.day_start(last),
        }
    }
}

/// The following calendar date, saturating at the end of chrono's range.
#[must_use]
pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

/// The first date of the week containing `date`, for weeks starting on `week_start`.
#[must_use]
pub fn week_start_of(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let current = date.weekday().num_days_from_sunday();
    let start = week_start.num_days_from_sunday();
    let back = (current + 7 - start) % 7;
    date.checked_sub_days(Days::new(u64::from(back)))
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_start_in_utc() {
        let calendar = Calendar::new(Utc);
        let start = calendar.day_start(date(2025, 1, 29));
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn day_start_with_offset() {
        let calendar = Calendar::new(FixedOffset::east_opt(2 * 3600).unwrap());
        let start = calendar.day_start(date(2025, 1, 29));
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 28, 22, 0, 0).unwrap());
    }

    #[test]
    fn day_end_is_last_second() {
        let calendar = Calendar::new(Utc);
        let end = calendar.day_end(date(2025, 1, 29));
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 29, 23, 59, 59).unwrap());
    }

    #[test]
    fn date_of_respects_offset() {
        let calendar = Calendar::new(FixedOffset::west_opt(5 * 3600).unwrap());
        let instant = Utc.with_ymd_and_hms(2025, 1, 30, 3, 0, 0).unwrap();
        assert_eq!(calendar.date_of(instant), date(2025, 1, 29));
    }

    #[test]
    fn localize_keeps_instant() {
        let calendar = Calendar::new(FixedOffset::east_opt(3600).unwrap());
        let instant = Utc.with_ymd_and_hms(2025, 1, 30, 23, 30, 0).unwrap();
        let local = calendar.localize(instant);
        assert_eq!(local.to_rfc3339(), "2025-01-31T00:30:00+01:00");
        assert_eq!(local.with_timezone(&Utc), instant);
    }

    #[test]
    fn day_range_contains_only_that_day() {
        let calendar = Calendar::new(Utc);
        let range = calendar.day_range(date(2025, 1, 29));
        assert!(range.contains(Utc.with_ymd_and_hms(2025, 1, 29, 0, 0, 0).unwrap()));
        assert!(range.contains(Utc.with_ymd_and_hms(2025, 1, 29, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2025, 1, 30, 0, 0, 0).unwrap()));
    }

    #[test]
    fn week_start_sunday() {
        // Jan 29, 2025 is a Wednesday
        assert_eq!(week_start_of(date(2025, 1, 29), Weekday::Sun), date(2025, 1, 26));
        assert_eq!(week_start_of(date(2025, 1, 26), Weekday::Sun), date(2025, 1, 26));
        assert_eq!(week_start_of(date(2025, 1, 25), Weekday::Sun), date(2025, 1, 19));
    }

    #[test]
    fn week_start_monday() {
        assert_eq!(week_start_of(date(2025, 1, 29), Weekday::Mon), date(2025, 1, 27));
        assert_eq!(week_start_of(date(2025, 2, 2), Weekday::Mon), date(2025, 1, 27));
    }

    #[test]
    fn days_range_spans_week() {
        let calendar = Calendar::new(Utc);
        let range = calendar.days_range(date(2025, 1, 26), 7);
        assert_eq!(range.start, Utc.with_ymd_and_hms(2025, 1, 26, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2025, 2, 2, 0, 0, 0).unwrap());
    }
}
