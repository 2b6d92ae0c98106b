use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use wl_core::EndReason;

use crate::event::TrackerEvent;
use crate::store::IntervalStore;
use crate::tracker::{SessionTracker, TrackerError, TrackerStatus};

/// How long [`TrackerHandle::shutdown_blocking`] waits by default.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared, mutex-serialized access to a [`SessionTracker`].
///
/// Every transition locks once, so a poll tick and an OS event can never
/// interleave inside a start or stop.
pub struct TrackerHandle<S, Tz: TimeZone> {
    inner: Arc<Mutex<SessionTracker<S, Tz>>>,
}

impl<S, Tz: TimeZone> Clone for TrackerHandle<S, Tz> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: IntervalStore, Tz: TimeZone> TrackerHandle<S, Tz> {
    pub fn new(tracker: SessionTracker<S, Tz>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    /// Runs `f` with exclusive access to the tracker.
    pub fn with_tracker<R>(&self, f: impl FnOnce(&mut SessionTracker<S, Tz>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn poll_at(
        &self,
        idle_secs: u64,
        presence: bool,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        self.lock().poll_at(idle_secs, presence, now)
    }

    pub fn handle_event(
        &self,
        event: &TrackerEvent,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        self.lock().handle_event(event, now)
    }

    /// Stops starting new sessions. Idempotent.
    pub fn prepare_for_shutdown(&self) {
        self.lock().prepare_for_shutdown();
    }

    /// Ends the current session with `reason` and stops tracking.
    pub fn end_session_now(&self, reason: EndReason) -> Result<(), TrackerError> {
        self.handle_event(&TrackerEvent::EndSessionNow(reason), Utc::now())
    }

    pub fn current_status(&self, now: DateTime<Utc>) -> Result<TrackerStatus, TrackerError> {
        self.lock().current_status(now)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().is_shutting_down()
    }

    fn lock(&self) -> MutexGuard<'_, SessionTracker<S, Tz>> {
        // A panic mid-transition leaves the state machine usable; keep going.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S, Tz> TrackerHandle<S, Tz>
where
    S: IntervalStore + Send + 'static,
    Tz: TimeZone + Send + 'static,
{
    /// Ends the session from a synchronous shutdown hook.
    ///
    /// The stop runs on a helper thread; if it has not finished within
    /// `timeout` (for example because the store is busy) this returns
    /// [`TrackerError::ShutdownTimedOut`] instead of blocking process exit.
    pub fn shutdown_blocking(
        &self,
        reason: EndReason,
        timeout: Duration,
    ) -> Result<(), TrackerError> {
        let (tx, rx) = mpsc::channel();
        let handle = self.clone();
        thread::spawn(move || {
            let result = handle.handle_event(&TrackerEvent::EndSessionNow(reason), Utc::now());
            // The receiver is gone if the caller already timed out.
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(?timeout, "shutdown did not finish in time");
                Err(TrackerError::ShutdownTimedOut(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TrackerError::ShutdownWorkerLost),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{TrackerConfig, TrackerState};
    use wl_core::Calendar;
    use wl_db::Database;

    fn handle() -> TrackerHandle<Database, Utc> {
        let tracker = SessionTracker::new(
            Database::open_in_memory().unwrap(),
            Calendar::new(Utc),
            TrackerConfig::default(),
        )
        .unwrap();
        TrackerHandle::new(tracker)
    }

    #[test]
    fn shutdown_blocking_closes_session() {
        let handle = handle();
        handle.poll_at(0, false, Utc::now()).unwrap();

        handle
            .shutdown_blocking(EndReason::Shutdown, DEFAULT_SHUTDOWN_TIMEOUT)
            .unwrap();

        assert!(handle.is_shutting_down());
        let intervals = handle.with_tracker(|t| t.store().list_intervals(true).unwrap());
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].end_reason, Some(EndReason::Shutdown));

        // Second shutdown is a no-op
        handle
            .shutdown_blocking(EndReason::ProcessExit, DEFAULT_SHUTDOWN_TIMEOUT)
            .unwrap();
        let intervals = handle.with_tracker(|t| t.store().list_intervals(true).unwrap());
        assert_eq!(intervals[0].end_reason, Some(EndReason::Shutdown));
    }

    #[test]
    fn shutdown_blocking_times_out_when_busy() {
        let handle = handle();
        handle.poll_at(0, false, Utc::now()).unwrap();

        let guard = handle.inner.lock().unwrap();
        let err = handle
            .shutdown_blocking(EndReason::Shutdown, Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, TrackerError::ShutdownTimedOut(_)));
        drop(guard);
    }

    #[test]
    fn concurrent_events_never_open_two_intervals() {
        let handle = handle();
        let threads: Vec<_> = (0..8)
            .map(|n| {
                let handle = handle.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let event = if n % 2 == 0 {
                            TrackerEvent::Unlock
                        } else {
                            TrackerEvent::Lock
                        };
                        handle.handle_event(&event, Utc::now()).unwrap();
                        handle.poll_at(0, false, Utc::now()).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let open = handle.with_tracker(|t| t.store().open_intervals().unwrap());
        assert!(open.len() <= 1);
    }

    #[test]
    fn prepare_then_end_session_now() {
        let handle = handle();
        handle.poll_at(0, false, Utc::now()).unwrap();
        handle.prepare_for_shutdown();
        assert_eq!(
            handle.current_status(Utc::now()).unwrap().state,
            TrackerState::Working
        );

        handle.end_session_now(EndReason::ApiRequest).unwrap();
        let status = handle.current_status(Utc::now()).unwrap();
        assert_eq!(status.state, TrackerState::Idle);
        assert!(status.shutting_down);
    }
}
