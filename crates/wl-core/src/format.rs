//! Duration and timestamp formatting shared by every view.

use chrono::{DateTime, FixedOffset, NaiveDate};

/// Placeholder shown for an empty time slot.
pub const PLACEHOLDER: &str = "-";

/// Formats seconds as `"Hh Mm"`, e.g. `"2h 5m"`. Negative input reads as zero.
pub fn format_hours_minutes(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{hours}h {minutes}m")
}

/// Formats seconds as a clock-style `"HH:MM:SS"`; hours may exceed 24.
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Seconds as hours rounded to one decimal place, for chart values.
#[expect(
    clippy::cast_precision_loss,
    reason = "chart values only need one decimal place"
)]
pub fn hours_one_decimal(seconds: i64) -> f64 {
    let hours = seconds.max(0) as f64 / 3600.0;
    (hours * 10.0).round() / 10.0
}

/// `"29 Jan, 25 - 09:15"`, used by grid rows.
pub fn format_slot(local: &DateTime<FixedOffset>) -> String {
    local.format("%-d %b, %y - %H:%M").to_string()
}

/// `"09:15"`.
pub fn format_time_of_day(local: &DateTime<FixedOffset>) -> String {
    local.format("%H:%M").to_string()
}

/// `"29 Jan, 25"`.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%-d %b, %y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hours_minutes_formatting() {
        assert_eq!(format_hours_minutes(0), "0h 0m");
        assert_eq!(format_hours_minutes(59), "0h 0m");
        assert_eq!(format_hours_minutes(310), "0h 5m");
        assert_eq!(format_hours_minutes(9_000), "2h 30m");
        assert_eq!(format_hours_minutes(30 * 3600), "30h 0m");
    }

    #[test]
    fn hours_minutes_negative_is_zero() {
        assert_eq!(format_hours_minutes(-1), "0h 0m");
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(3_661), "01:01:01");
        assert_eq!(format_clock(100 * 3600), "100:00:00");
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "values are rounded to one decimal place"
    )]
    fn hours_rounded_to_one_decimal() {
        assert_eq!(hours_one_decimal(0), 0.0);
        assert_eq!(hours_one_decimal(5_400), 1.5);
        assert_eq!(hours_one_decimal(3_600 + 200), 1.1);
        assert_eq!(hours_one_decimal(-20), 0.0);
    }

    #[test]
    fn slot_formatting() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let local = offset.with_ymd_and_hms(2025, 1, 9, 7, 5, 0).unwrap();
        assert_eq!(format_slot(&local), "9 Jan, 25 - 07:05");
        assert_eq!(format_time_of_day(&local), "07:05");
        assert_eq!(format_day(local.date_naive()), "9 Jan, 25");
    }
}
