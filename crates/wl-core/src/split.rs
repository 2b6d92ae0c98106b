//! Midnight-split planning.
//!
//! Closing a session produces one stored interval per local calendar day it
//! touched. The first piece closes the interval that is already open; every
//! later piece is a new `SplitContinuation` interval starting at 00:00:00.
//! The planner is pure so the tracker can apply the plan against any store.

use chrono::{DateTime, TimeZone, Utc};

use crate::calendar::{Calendar, next_day};
use crate::reason::EndReason;

/// Upper bound on the number of midnights a single stop may split across.
///
/// Anything past this stays in the final piece.
pub const MAX_SPLIT_DAYS: usize = 400;

/// One closed span of a planned stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub end_reason: EndReason,
}

/// How to close the open interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopPlan {
    /// The end after clamping to the interval start.
    pub end: DateTime<Utc>,
    /// True when the requested end preceded the interval start.
    pub clamped: bool,
    /// `segments[0]` closes the open interval, the rest are continuations.
    pub segments: Vec<Segment>,
}

impl StopPlan {
    pub fn is_split(&self) -> bool {
        self.segments.len() > 1
    }
}

/// Plans closing an interval that started at `interval_start`.
pub fn plan_stop<Tz: TimeZone>(
    calendar: &Calendar<Tz>,
    interval_start: DateTime<Utc>,
    requested_end: DateTime<Utc>,
    reason: &EndReason,
) -> StopPlan {
    let clamped = requested_end < interval_start;
    let end = requested_end.max(interval_start);

    let pieces = midnight_pieces(calendar, interval_start, end);
    let last = pieces.len() - 1;
    let segments = pieces
        .into_iter()
        .enumerate()
        .map(|(index, (start, piece_end))| {
            let end_reason = if index < last {
                EndReason::SplitBoundary
            } else if last > 0 {
                reason.for_continuation()
            } else {
                reason.clone()
            };
            Segment {
                start,
                end: piece_end,
                end_reason,
            }
        })
        .collect();

    StopPlan {
        end,
        clamped,
        segments,
    }
}

/// Cuts `[start, end]` at every local midnight.
///
/// Each piece but the last ends at 23:59:59 of its day, and the next piece
/// starts at 00:00:00 of the following day. Always returns at least one piece.
fn midnight_pieces<Tz: TimeZone>(
    calendar: &Calendar<Tz>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let end_date = calendar.date_of(end);
    let mut pieces = Vec::new();
    let mut cursor = start;

    while pieces.len() < MAX_SPLIT_DAYS {
        let day = calendar.date_of(cursor);
        if day >= end_date {
            break;
        }
        let next_start = calendar.day_start(next_day(day));
        if next_start <= cursor || next_start > end {
            break;
        }
        let boundary = calendar.day_end(day).max(cursor);
        pieces.push((cursor, boundary));
        cursor = next_start;
    }

    pieces.push((cursor, end));
    pieces
}
