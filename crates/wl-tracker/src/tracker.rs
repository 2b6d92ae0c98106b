//! The session state machine.
//!
//! Every method takes the current instant explicitly so behavior around
//! midnight, idle timeouts and sleeps can be tested deterministically. All
//! instants are truncated to milliseconds before they reach the store, which
//! keeps the in-memory interval start identical to the persisted one.

use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeDelta, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;
use wl_core::split;
use wl_core::{Calendar, EndReason, Interval, IntervalId, StartReason};
use wl_db::{CloseOutcome, DbError};

use crate::event::TrackerEvent;
use crate::source::SourceError;
use crate::store::IntervalStore;

/// Upper bound on split links followed when resolving a session's true start.
pub const MAX_TRUE_START_HOPS: usize = 50;

/// Tracker errors.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("storage error")]
    Store(#[from] DbError),
    #[error("activity source error")]
    Source(#[from] SourceError),
    #[error("activity source task failed")]
    SourceTask(#[from] tokio::task::JoinError),
    #[error("end reason {0:?} cannot be requested")]
    UnrequestableReason(String),
    #[error("shutdown did not finish within {0:?}")]
    ShutdownTimedOut(Duration),
    #[error("shutdown worker exited without reporting")]
    ShutdownWorkerLost,
}

/// Thresholds driving poll transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Idle below this counts as activity and starts a session.
    pub activity_threshold_secs: u64,
    /// Idle at or above this ends the session.
    pub idle_timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            activity_threshold_secs: 2,
            idle_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerState {
    Working,
    Idle,
}

/// Snapshot for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerStatus {
    pub state: TrackerState,
    /// Seconds since the true start; zero while idle.
    pub duration_so_far: i64,
    /// Start of the logical session across midnight splits.
    pub true_start: Option<DateTime<Utc>>,
    pub locked: bool,
    pub shutting_down: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Idle,
    Working {
        interval_id: IntervalId,
        /// Start of the open interval, as stored.
        start: DateTime<Utc>,
    },
}

/// Owns the current session and applies transitions against a store.
pub struct SessionTracker<S, Tz: TimeZone> {
    store: S,
    calendar: Calendar<Tz>,
    config: TrackerConfig,
    session: Session,
    locked: bool,
    shutting_down: bool,
}

impl<S: IntervalStore, Tz: TimeZone> SessionTracker<S, Tz> {
    /// Creates an idle tracker.
    ///
    /// Intervals left open by a previous process are closed with
    /// [`EndReason::ProcessExit`] at their own start; their real end is unknown.
    pub fn new(
        mut store: S,
        calendar: Calendar<Tz>,
        config: TrackerConfig,
    ) -> Result<Self, TrackerError> {
        for interval in store.open_intervals()? {
            tracing::warn!(
                id = %interval.id,
                start = %interval.start_time,
                "closing interval left open by a previous run"
            );
            store.close_interval(interval.id, interval.start_time, &EndReason::ProcessExit)?;
        }
        Ok(Self {
            store,
            calendar,
            config,
            session: Session::Idle,
            locked: false,
            shutting_down: false,
        })
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> TrackerConfig {
        self.config
    }

    pub const fn is_working(&self) -> bool {
        matches!(self.session, Session::Working { .. })
    }

    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    pub const fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Applies one poll tick.
    ///
    /// `presence` overrides the idle timeout while true.
    pub fn poll_at(
        &mut self,
        idle_secs: u64,
        presence: bool,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        match self.session {
            Session::Idle => {
                if idle_secs < self.config.activity_threshold_secs
                    && !self.locked
                    && !self.shutting_down
                {
                    self.start_at(now)?;
                }
            }
            Session::Working { .. } => {
                if idle_secs >= self.config.idle_timeout_secs && !presence {
                    let idle = TimeDelta::seconds(i64::try_from(idle_secs).unwrap_or(i64::MAX));
                    let end = now.checked_sub_signed(idle).unwrap_or(DateTime::<Utc>::MIN_UTC);
                    tracing::info!(idle_secs, %end, "idle timeout");
                    self.stop_at(end, &EndReason::IdleTimeout)?;
                }
            }
        }
        Ok(())
    }

    /// Applies an OS or control event.
    pub fn handle_event(
        &mut self,
        event: &TrackerEvent,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        tracing::debug!(%event, "tracker event");
        match event {
            TrackerEvent::Lock => {
                self.locked = true;
                self.stop_at(now, &EndReason::Lock)?;
            }
            TrackerEvent::Unlock => {
                self.locked = false;
                self.start_at(now)?;
            }
            TrackerEvent::Suspend => self.stop_at(now, &EndReason::Sleep)?,
            TrackerEvent::Resume => {}
            TrackerEvent::SessionEnding => self.stop_at(now, &EndReason::Shutdown)?,
            TrackerEvent::AppStopping => {
                self.shutting_down = true;
                self.stop_at(now, &EndReason::Shutdown)?;
            }
            TrackerEvent::ProcessExit => {
                self.shutting_down = true;
                self.stop_at(now, &EndReason::ProcessExit)?;
            }
            TrackerEvent::EndSessionNow(reason) => {
                let reason = reason.clone().canonical();
                if !reason.is_requestable() {
                    return Err(TrackerError::UnrequestableReason(reason.as_str().to_string()));
                }
                self.shutting_down = true;
                self.stop_at(now, &reason)?;
            }
            TrackerEvent::PrepareForShutdown => self.prepare_for_shutdown(),
        }
        Ok(())
    }

    /// Stops starting new sessions; the open one, if any, stays open.
    pub fn prepare_for_shutdown(&mut self) {
        if !self.shutting_down {
            tracing::info!("preparing for shutdown");
        }
        self.shutting_down = true;
    }

    /// Opens a session at `now`.
    ///
    /// Returns `false` without touching the store when already working or
    /// shutting down.
    pub fn start_at(&mut self, now: DateTime<Utc>) -> Result<bool, TrackerError> {
        if self.is_working() || self.shutting_down {
            return Ok(false);
        }
        let start = now.trunc_subsecs(3);
        let interval_id = self
            .store
            .create_open_interval(start, StartReason::NormalStart)?;
        tracing::info!(id = %interval_id, %start, "session started");
        self.session = Session::Working { interval_id, start };
        Ok(true)
    }

    /// Closes the session at `end`, splitting at every local midnight crossed.
    ///
    /// A no-op while idle, so calling it twice is safe. The split is written
    /// atomically; if that write fails the session stays Working.
    pub fn stop_at(&mut self, end: DateTime<Utc>, reason: &EndReason) -> Result<(), TrackerError> {
        let Session::Working { interval_id, start } = self.session else {
            return Ok(());
        };

        let reason = reason.clone().canonical();
        let plan = split::plan_stop(&self.calendar, start, end.trunc_subsecs(3), &reason);
        if plan.clamped {
            tracing::debug!(id = %interval_id, requested = %end, "end before start, clamped");
        }
        let Some((first, continuations)) = plan.segments.split_first() else {
            return Ok(());
        };

        match self.store.close_split(interval_id, first, continuations)? {
            CloseOutcome::Closed => {}
            outcome => tracing::warn!(id = %interval_id, ?outcome, "interval was not open"),
        }
        self.session = Session::Idle;

        tracing::info!(
            id = %interval_id,
            end = %plan.end,
            %reason,
            split = plan.is_split(),
            "session stopped"
        );
        Ok(())
    }

    /// Start of the logical session, following split links backwards.
    ///
    /// Gives up after [`MAX_TRUE_START_HOPS`] links and returns the earliest
    /// start reached. `None` while idle.
    pub fn true_session_start(&self) -> Result<Option<DateTime<Utc>>, TrackerError> {
        let Session::Working { interval_id, start } = self.session else {
            return Ok(None);
        };
        let Some(current) = self.store.get_interval(interval_id)? else {
            return Ok(Some(start));
        };
        Ok(Some(resolve_true_start(&self.store, current)?))
    }

    /// Current state, elapsed time and true start.
    pub fn current_status(&self, now: DateTime<Utc>) -> Result<TrackerStatus, TrackerError> {
        let true_start = self.true_session_start()?;
        let (state, duration_so_far) = match true_start {
            Some(start) if self.is_working() => (
                TrackerState::Working,
                wl_core::duration_seconds(start, now),
            ),
            _ => (TrackerState::Idle, 0),
        };
        Ok(TrackerStatus {
            state,
            duration_so_far,
            true_start,
            locked: self.locked,
            shutting_down: self.shutting_down,
        })
    }
}

/// Follows split links back from `interval` to the start of its logical session.
///
/// Stops at the first interval that is not a continuation, at a missing link,
/// or after [`MAX_TRUE_START_HOPS`] links, returning the earliest start reached.
pub fn resolve_true_start<S: IntervalStore>(
    store: &S,
    interval: Interval,
) -> Result<DateTime<Utc>, DbError> {
    let mut current = interval;
    for _ in 0..MAX_TRUE_START_HOPS {
        if !current.is_split_continuation() {
            return Ok(current.start_time);
        }
        match store.find_prior_split_source(current.start_time)? {
            Some(prior) => current = prior,
            None => return Ok(current.start_time),
        }
    }
    tracing::debug!(id = %current.id, "true start walk hit the hop limit");
    Ok(current.start_time)
}
