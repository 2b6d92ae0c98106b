//! Day command: one day's totals, its sessions and the neighbouring days.

use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;
use wl_core::Calendar;
use wl_core::format::PLACEHOLDER;
use wl_db::{Database, DayDetail, SessionAggregator};

use super::util::{write_json, write_page_footer, write_session_table};
use crate::Paging;

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    calendar: Calendar<Tz>,
    date: &str,
    paging: Paging,
    json: bool,
) -> Result<()> {
    let detail =
        SessionAggregator::new(db, calendar).day_detail(date, paging.page, paging.page_size)?;
    if json {
        // `null` for a day without data
        return write_json(writer, &detail);
    }
    match detail {
        Some(detail) => write_detail(writer, &detail),
        None => {
            writeln!(writer, "No sessions recorded on {date}.")?;
            Ok(())
        }
    }
}

fn write_detail<W: Write>(writer: &mut W, detail: &DayDetail) -> Result<()> {
    let summary = &detail.summary;
    writeln!(writer, "{}, {}", summary.day, summary.date)?;
    writeln!(writer, "Worked:    {}", summary.total_duration)?;
    writeln!(writer, "Sessions:  {}", summary.session_count)?;
    if let Some(tag) = summary.shift_tag {
        writeln!(writer, "Shift:     {}", tag.as_str())?;
    }
    writeln!(
        writer,
        "Previous:  {}",
        detail.previous_day.as_deref().unwrap_or(PLACEHOLDER)
    )?;
    writeln!(
        writer,
        "Next:      {}",
        detail.next_day.as_deref().unwrap_or(PLACEHOLDER)
    )?;
    writeln!(writer)?;
    write_session_table(writer, &detail.sessions.data)?;
    write_page_footer(writer, &detail.sessions, "sessions")
}
