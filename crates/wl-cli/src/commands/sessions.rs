//! Sessions command: the paginated session grid.

use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;
use wl_core::Calendar;
use wl_db::{Database, SessionAggregator};

use super::util::{write_json, write_page_footer, write_session_table};
use crate::Paging;

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    calendar: Calendar<Tz>,
    paging: Paging,
    include_active: bool,
    date: Option<&str>,
    json: bool,
) -> Result<()> {
    let page = SessionAggregator::new(db, calendar).sessions_page(
        paging.page,
        paging.page_size,
        include_active,
        date,
    )?;
    if json {
        return write_json(writer, &page);
    }
    if page.total_items == 0 {
        writeln!(writer, "No sessions recorded.")?;
        return Ok(());
    }
    write_session_table(writer, &page.data)?;
    write_page_footer(writer, &page, "sessions")
}
