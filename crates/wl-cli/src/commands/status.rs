//! Status command: the open session, if any, and whether `wl run` is alive.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use fs2::FileExt;
use serde::Serialize;
use wl_core::format::{format_clock, format_slot};
use wl_core::{Calendar, duration_seconds};
use wl_db::Database;
use wl_tracker::{TrackerState, resolve_true_start};

use super::util::write_json;
use crate::Config;

/// Tracker state as seen from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub state: TrackerState,
    /// Local start of the logical session, following midnight splits back.
    pub since: Option<String>,
    pub duration_so_far: i64,
    pub daemon_running: bool,
    pub timezone: String,
    pub database: PathBuf,
}

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    calendar: &Calendar<Tz>,
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
    let report = build_report(db, config, calendar, now, timezone)?;
    if json {
        return write_json(writer, &report);
    }
    write_status(writer, &report)
}

pub fn build_report<Tz: TimeZone>(
    db: &Database,
    config: &Config,
    calendar: &Calendar<Tz>,
    now: DateTime<Utc>,
    timezone: String,
) -> Result<StatusReport> {
    let daemon_running = daemon_running(&config.lock_path());
    // Normally at most one; the newest wins if a crash left more.
    let open = db.open_intervals()?.pop();
    let (state, since, duration_so_far) = match open {
        Some(interval) => {
            let start = resolve_true_start(db, interval)?;
            (
                TrackerState::Working,
                Some(calendar.localize(start).to_rfc3339()),
                duration_seconds(start, now),
            )
        }
        None => (TrackerState::Idle, None, 0),
    };
    tracing::debug!(?state, daemon_running, "status resolved");

    Ok(StatusReport {
        state,
        since,
        duration_so_far,
        daemon_running,
        timezone,
        database: config.database_path.clone(),
    })
}

/// True when another process holds the `wl run` lock.
fn daemon_running(lock_path: &Path) -> bool {
    let Ok(file) = File::open(lock_path) else {
        return false;
    };
    if FileExt::try_lock_shared(&file).is_err() {
        return true;
    }
    if let Err(err) = FileExt::unlock(&file) {
        tracing::debug!(error = %err, "failed to release liveness check lock");
    }
    false
}

fn write_status<W: Write>(writer: &mut W, report: &StatusReport) -> Result<()> {
    writeln!(writer, "Worklog status")?;
    writeln!(writer, "Database:  {}", report.database.display())?;
    writeln!(
        writer,
        "Daemon:    {}",
        if report.daemon_running {
            "running"
        } else {
            "not running"
        }
    )?;
    writeln!(writer, "Time zone: {}", report.timezone)?;
    match report
        .since
        .as_deref()
        .and_then(|since| DateTime::parse_from_rfc3339(since).ok())
    {
        Some(since) => writeln!(
            writer,
            "State:     working since {} ({})",
            format_slot(&since),
            format_clock(report.duration_so_far)
        )?,
        None => writeln!(writer, "State:     idle")?,
    }
    Ok(())
}
