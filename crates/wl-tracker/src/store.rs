use chrono::{DateTime, Utc};
use wl_core::split::Segment;
use wl_core::{EndReason, Interval, IntervalId, StartReason};
use wl_db::{CloseOutcome, Database, DbError};

/// The storage operations the tracker depends on.
///
/// Implemented by [`Database`]; tests substitute stores that fail on demand.
pub trait IntervalStore {
    fn create_open_interval(
        &mut self,
        start: DateTime<Utc>,
        start_reason: StartReason,
    ) -> Result<IntervalId, DbError>;

    fn close_interval(
        &mut self,
        id: IntervalId,
        end: DateTime<Utc>,
        end_reason: &EndReason,
    ) -> Result<CloseOutcome, DbError>;

    /// Closes `id` with `first` and stores `continuations` after it as one
    /// atomic write. On error nothing has changed.
    fn close_split(
        &mut self,
        id: IntervalId,
        first: &Segment,
        continuations: &[Segment],
    ) -> Result<CloseOutcome, DbError>;

    fn get_interval(&self, id: IntervalId) -> Result<Option<Interval>, DbError>;

    fn open_intervals(&self) -> Result<Vec<Interval>, DbError>;

    fn find_prior_split_source(&self, start: DateTime<Utc>) -> Result<Option<Interval>, DbError>;
}

impl IntervalStore for Database {
    fn create_open_interval(
        &mut self,
        start: DateTime<Utc>,
        start_reason: StartReason,
    ) -> Result<IntervalId, DbError> {
        Self::create_open_interval(self, start, start_reason)
    }

    fn close_interval(
        &mut self,
        id: IntervalId,
        end: DateTime<Utc>,
        end_reason: &EndReason,
    ) -> Result<CloseOutcome, DbError> {
        Self::close_interval(self, id, end, end_reason)
    }

    fn close_split(
        &mut self,
        id: IntervalId,
        first: &Segment,
        continuations: &[Segment],
    ) -> Result<CloseOutcome, DbError> {
        Self::close_split(self, id, first, continuations)
    }

    fn get_interval(&self, id: IntervalId) -> Result<Option<Interval>, DbError> {
        Self::get_interval(self, id)
    }

    fn open_intervals(&self) -> Result<Vec<Interval>, DbError> {
        Self::open_intervals(self)
    }

    fn find_prior_split_source(&self, start: DateTime<Utc>) -> Result<Option<Interval>, DbError> {
        Self::find_prior_split_source(self, start)
    }
}
