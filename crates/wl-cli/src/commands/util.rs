//! Shared output helpers for CLI commands.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use wl_core::{Page, SessionRow};

/// Writes `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

/// Writes the session grid, one row per interval.
pub fn write_session_table<W: Write>(writer: &mut W, rows: &[SessionRow]) -> Result<()> {
    writeln!(
        writer,
        "{:>4}  {:<18}  {:<18}  {:<18}  {:<18}  {:>8}  TAG",
        "ID", "CHECK IN", "SHIFT OUT", "SHIFT IN", "CHECK OUT", "DURATION"
    )?;
    for row in rows {
        let tag = if row.is_open {
            "active"
        } else {
            row.shift_tag.map_or("", |tag| tag.as_str())
        };
        let line = format!(
            "{:>4}  {:<18}  {:<18}  {:<18}  {:<18}  {:>8}  {tag}",
            row.id,
            row.check_in.display,
            row.shift_out.display,
            row.shift_in.display,
            row.checkout.display,
            row.duration,
        );
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}

/// `Page 1 of 3 (25 sessions)`.
pub fn write_page_footer<W: Write, T>(writer: &mut W, page: &Page<T>, noun: &str) -> Result<()> {
    writeln!(
        writer,
        "Page {} of {} ({} {noun})",
        page.page,
        page.total_pages.max(1),
        page.total_items
    )?;
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use chrono::{DateTime, TimeZone, Utc};
    use wl_core::{EndReason, StartReason};
    use wl_db::Database;

    pub fn utc(d: u32, h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, h, m, s).unwrap()
    }

    fn seed(
        db: &mut Database,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        start_reason: StartReason,
        end_reason: &EndReason,
    ) {
        let id = db.create_open_interval(start, start_reason).unwrap();
        db.close_interval(id, end, end_reason).unwrap();
    }

    /// A session split at midnight into Jan 29, two more on Jan 29 and one on Jan 31.
    pub fn sample_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let normal = StartReason::NormalStart;
        seed(&mut db, utc(28, 22, 0, 0), utc(28, 23, 59, 59), normal, &EndReason::SplitBoundary);
        seed(
            &mut db,
            utc(29, 0, 0, 0),
            utc(29, 1, 0, 0),
            StartReason::SplitContinuation,
            &EndReason::NormalEnd,
        );
        seed(&mut db, utc(29, 9, 0, 0), utc(29, 11, 30, 0), normal, &EndReason::Lock);
        seed(&mut db, utc(29, 13, 0, 0), utc(29, 14, 0, 0), normal, &EndReason::IdleTimeout);
        seed(&mut db, utc(31, 8, 0, 0), utc(31, 8, 45, 0), normal, &EndReason::Shutdown);
        db
    }
}
