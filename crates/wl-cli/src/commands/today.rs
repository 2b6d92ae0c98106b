//! Today command: the dashboard card for the current local day.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use wl_core::{Calendar, TodaySummary};
use wl_db::{Database, SessionAggregator};

use super::util::write_json;

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    calendar: Calendar<Tz>,
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let summary = SessionAggregator::new(db, calendar).today_summary(now)?;
    if json {
        return write_json(writer, &summary);
    }
    write_today(writer, &summary)
}

fn write_today<W: Write>(writer: &mut W, summary: &TodaySummary) -> Result<()> {
    writeln!(writer, "Today: {}", summary.date)?;
    writeln!(writer, "Worked:    {}", summary.total_duration)?;
    writeln!(writer, "Sessions:  {}", summary.session_count)?;
    writeln!(writer, "First in:  {}", summary.first_check_in)?;
    writeln!(writer, "Last out:  {}", summary.latest_check_out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::util::testing::{sample_db, utc};

    use insta::assert_snapshot;

    fn output(db: &Database, now: DateTime<Utc>, json: bool) -> String {
        let mut out = Vec::new();
        run(&mut out, db, Calendar::new(Utc), now, json).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn today_counts_continuation_time_but_not_the_session() {
        let db = sample_db();
        assert_snapshot!(output(&db, utc(29, 18, 0, 0), false), @r"
        Today: 2025-01-29
        Worked:    4h 30m
        Sessions:  2
        First in:  00:00
        Last out:  14:00
        ");
    }

    #[test]
    fn empty_day_shows_placeholders() {
        let db = sample_db();
        assert_snapshot!(output(&db, utc(30, 12, 0, 0), false), @r"
        Today: 2025-01-30
        Worked:    0h 0m
        Sessions:  0
        First in:  -
        Last out:  -
        ");
    }

    #[test]
    fn json_uses_camel_case() {
        let db = sample_db();
        let value: serde_json::Value =
            serde_json::from_str(&output(&db, utc(29, 18, 0, 0), true)).unwrap();
        assert_eq!(value["totalSeconds"], 16_200);
        assert_eq!(value["sessionCount"], 2);
        assert_eq!(value["firstCheckIn"], "00:00");
        assert_eq!(value["latestCheckOut"], "14:00");
    }
}
