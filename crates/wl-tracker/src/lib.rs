//! Session tracking for the work session tracker.
//!
//! [`SessionTracker`] owns the "current session" state and applies every
//! transition (poll ticks, OS events, external control) against an
//! [`IntervalStore`]. [`TrackerHandle`] serializes access behind one mutex so
//! the async [`run_poll_loop`] and synchronous shutdown hooks share a single
//! code path.

mod event;
mod handle;
mod poll;
pub mod source;
mod store;
mod tracker;

pub use event::TrackerEvent;
pub use handle::{DEFAULT_SHUTDOWN_TIMEOUT, TrackerHandle};
pub use poll::run_poll_loop;
pub use source::{
    ActivitySource, CommandActivitySource, FixedActivitySource, IdleUnit, SourceError,
};
pub use store::IntervalStore;
pub use tracker::{
    MAX_TRUE_START_HOPS, SessionTracker, TrackerConfig, TrackerError, TrackerState, TrackerStatus,
    resolve_true_start,
};
