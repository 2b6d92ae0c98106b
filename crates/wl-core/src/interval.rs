//! The persisted work interval.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reason::{EndReason, StartReason};

/// Identifier of a stored interval.
///
/// Assigned monotonically by the store and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntervalId(i64);

impl IntervalId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for IntervalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One contiguous recorded span of working time, open or closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub id: IntervalId,
    pub start_time: DateTime<Utc>,
    /// Unset while the interval is open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// `end_time - start_time` in whole seconds; zero while open.
    pub duration_seconds: i64,
    pub start_reason: StartReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<EndReason>,
}

impl Interval {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// True for the synthetic post-midnight half of a split session.
    #[must_use]
    pub fn is_split_continuation(&self) -> bool {
        self.start_reason == StartReason::SplitContinuation
    }

    /// True when the interval was closed at a midnight boundary.
    #[must_use]
    pub fn ends_at_split_boundary(&self) -> bool {
        self.end_reason == Some(EndReason::SplitBoundary)
    }
}

/// Whole seconds between `start` and `end`, never negative.
#[must_use]
pub fn duration_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    end.signed_duration_since(start).num_seconds().max(0)
}
