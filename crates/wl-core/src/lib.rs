//! Core domain logic for the work session tracker.
//!
//! This crate contains the fundamental types and pure logic for:
//! - Intervals: the persisted spans of working time and their reasons
//! - Calendar: local-day arithmetic over any `chrono` time zone
//! - Splitting: cutting a session at local midnights
//! - Views: grid rows and summaries derived from intervals

pub mod calendar;
pub mod format;
mod interval;
pub mod page;
mod reason;
pub mod split;
pub mod view;

pub use calendar::{Calendar, UtcRange};
pub use interval::{Interval, IntervalId, duration_seconds};
pub use page::{Page, PageRequest};
pub use reason::{EndReason, ReasonParseError, StartReason};
pub use view::{
    ChartPoint, DaySummary, SessionRow, ShiftTag, TimeSlot, TodaySummary, WeekSummary,
};
