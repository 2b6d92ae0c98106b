use std::future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, Timeout};
use tokio_util::sync::CancellationToken;

use crate::event::TrackerEvent;
use crate::handle::TrackerHandle;
use crate::source::{ActivitySource, SourceError};
use crate::store::IntervalStore;
use crate::tracker::TrackerError;

/// One idle reading taken off the async runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reading {
    idle_secs: u64,
    presence: bool,
}

type PendingRead = Pin<Box<Timeout<JoinHandle<Result<Reading, SourceError>>>>>;

/// Drives the tracker until cancelled or shutting down.
///
/// Each tick reads the idle signal once on a blocking thread and applies one
/// poll transition. A read that takes longer than `interval` is abandoned and
/// counts as a failed tick; events and cancellation are handled while a read
/// is in flight. OS events from `events` go through the same handle, so every
/// transition is serialized. A failing tick is logged and the loop carries on.
pub async fn run_poll_loop<S, Tz, A>(
    handle: TrackerHandle<S, Tz>,
    source: A,
    mut events: mpsc::Receiver<TrackerEvent>,
    interval: Duration,
    cancel: CancellationToken,
) where
    S: IntervalStore,
    Tz: TimeZone,
    A: ActivitySource + Send + 'static,
{
    let source = Arc::new(Mutex::new(source));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut events_open = true;
    let mut pending: Option<PendingRead> = None;

    tracing::info!(interval_secs = interval.as_secs(), "poll loop started");
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::info!("poll loop cancelled");
                break;
            }
            event = events.recv(), if events_open => match event {
                Some(event) => {
                    if let Err(err) = handle.handle_event(&event, Utc::now()) {
                        tracing::error!(%event, error = ?err, "failed to apply event");
                    }
                }
                None => {
                    tracing::debug!("event channel closed");
                    events_open = false;
                }
            },
            read = finish_read(&mut pending, interval), if pending.is_some() => {
                pending = None;
                let applied = read.and_then(|reading| {
                    tracing::trace!(
                        idle_secs = reading.idle_secs,
                        presence = reading.presence,
                        "poll tick"
                    );
                    handle.poll_at(reading.idle_secs, reading.presence, Utc::now())
                });
                if let Err(err) = applied {
                    tracing::error!(error = ?err, "poll tick failed");
                }
            }
            _ = ticker.tick() => {
                if pending.is_some() {
                    tracing::debug!("previous idle read still pending, skipping tick");
                } else {
                    let timeout = handle.with_tracker(|tracker| tracker.config().idle_timeout_secs);
                    let source = Arc::clone(&source);
                    let read = tokio::task::spawn_blocking(move || read_source(&source, timeout));
                    pending = Some(Box::pin(tokio::time::timeout(interval, read)));
                }
            }
        }

        if handle.is_shutting_down() {
            tracing::info!("tracker shutting down, poll loop exiting");
            break;
        }
    }
}

async fn finish_read(
    pending: &mut Option<PendingRead>,
    limit: Duration,
) -> Result<Reading, TrackerError> {
    let Some(read) = pending.as_mut() else {
        return future::pending().await;
    };
    match read.await {
        Ok(Ok(reading)) => reading.map_err(TrackerError::from),
        Ok(Err(join)) => Err(TrackerError::SourceTask(join)),
        Err(_) => Err(SourceError::TimedOut(limit).into()),
    }
}

/// Reads idle time, and presence only when it could change the outcome.
///
/// A read abandoned after a timeout keeps the source locked until it returns;
/// later reads fail fast with [`SourceError::Busy`] instead of queueing.
fn read_source<A: ActivitySource>(
    source: &Mutex<A>,
    idle_timeout_secs: u64,
) -> Result<Reading, SourceError> {
    let mut source = match source.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        Err(TryLockError::WouldBlock) => return Err(SourceError::Busy),
    };
    let idle_secs = source.idle_seconds()?;
    let presence = idle_secs >= idle_timeout_secs && source.presence_asserted();
    drop(source);
    Ok(Reading {
        idle_secs,
        presence,
    })
}
