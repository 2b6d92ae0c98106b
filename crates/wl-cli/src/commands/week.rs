//! Week command: per-day totals for one week as a text bar chart.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc, Weekday};
use wl_core::{Calendar, WeekSummary};
use wl_db::{Database, SessionAggregator};

use super::util::write_json;

/// One `#` per half hour.
const BLOCKS_PER_HOUR: f64 = 2.0;

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    calendar: Calendar<Tz>,
    week_start: Weekday,
    now: DateTime<Utc>,
    offset: i32,
    json: bool,
) -> Result<()> {
    let summary = SessionAggregator::new(db, calendar)
        .with_week_start(week_start)
        .week_summary(now, offset)?;
    if json {
        return write_json(writer, &summary);
    }
    write_week(writer, &summary)
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "bar length is rounded and clamped to zero first"
)]
fn bar(hours: f64) -> String {
    "#".repeat((hours * BLOCKS_PER_HOUR).round().max(0.0) as usize)
}

fn write_week<W: Write>(writer: &mut W, summary: &WeekSummary) -> Result<()> {
    let current = if summary.is_latest_week {
        " (current)"
    } else {
        ""
    };
    writeln!(writer, "Week of {}{current}", summary.week_start)?;
    for point in &summary.chart_data {
        let line = format!(
            "{}  {:>7}  {}",
            point.axis_label,
            point.label,
            bar(point.value)
        );
        writeln!(writer, "{}", line.trim_end())?;
    }
    writeln!(writer, "Total: {}", summary.total_duration)?;
    Ok(())
}
