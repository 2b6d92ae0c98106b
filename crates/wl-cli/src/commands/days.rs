//! Days command: one summary row per day with tracked time.

use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;
use wl_core::{Calendar, DaySummary};
use wl_db::{Database, SessionAggregator};

use super::util::{write_json, write_page_footer};
use crate::Paging;

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    calendar: Calendar<Tz>,
    paging: Paging,
    json: bool,
) -> Result<()> {
    let page =
        SessionAggregator::new(db, calendar).daily_summaries_page(paging.page, paging.page_size)?;
    if json {
        return write_json(writer, &page);
    }
    if page.total_items == 0 {
        writeln!(writer, "No days recorded.")?;
        return Ok(());
    }
    write_day_rows(writer, &page.data)?;
    write_page_footer(writer, &page, "days")
}

fn write_day_rows<W: Write>(writer: &mut W, days: &[DaySummary]) -> Result<()> {
    writeln!(
        writer,
        "{:<10}  {:<9}  {:>7}  {:>8}  TAG",
        "DATE", "DAY", "WORKED", "SESSIONS"
    )?;
    for day in days {
        let line = format!(
            "{:<10}  {:<9}  {:>7}  {:>8}  {}",
            day.date_iso,
            day.day,
            day.total_duration,
            day.session_count,
            day.shift_tag.map_or("", |tag| tag.as_str())
        );
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}
