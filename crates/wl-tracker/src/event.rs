use std::fmt;

use wl_core::EndReason;

/// An OS or control event delivered to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// The OS session was locked.
    Lock,
    /// The OS session was unlocked.
    Unlock,
    /// The machine is about to sleep.
    Suspend,
    /// The machine woke up. Does not start a session by itself.
    Resume,
    /// The user is logging off or the OS is shutting down.
    SessionEnding,
    /// The process is about to exit.
    ProcessExit,
    /// The host application is stopping.
    AppStopping,
    /// External request to end the session and stop tracking.
    EndSessionNow(EndReason),
    /// Stop starting new sessions; the current one stays open.
    PrepareForShutdown,
}

impl fmt::Display for TrackerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => f.write_str("lock"),
            Self::Unlock => f.write_str("unlock"),
            Self::Suspend => f.write_str("suspend"),
            Self::Resume => f.write_str("resume"),
            Self::SessionEnding => f.write_str("session_ending"),
            Self::ProcessExit => f.write_str("process_exit"),
            Self::AppStopping => f.write_str("app_stopping"),
            Self::EndSessionNow(reason) => write!(f, "end_session_now({reason})"),
            Self::PrepareForShutdown => f.write_str("prepare_for_shutdown"),
        }
    }
}
