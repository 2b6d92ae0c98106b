//! Run command: the foreground tracker daemon.
//!
//! Holds an exclusive lock beside the database so only one tracker writes
//! intervals, polls the idle command on a fixed interval and maps Unix
//! signals onto tracker events. Exiting for any reason closes the open
//! session through the bounded blocking shutdown path.

use std::fs::{self, File};
use std::io::Write;

use anyhow::{Context, Result};
use fs2::FileExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wl_core::{Calendar, EndReason};
use wl_db::Database;
use wl_tracker::{
    CommandActivitySource, SessionTracker, TrackerError, TrackerEvent, TrackerHandle,
    run_poll_loop,
};

use crate::Config;

const EVENT_BUFFER: usize = 16;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    if let Some(parent) = config.database_path.parent() {
        fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let lock_path = config.lock_path();
    let lock_file = File::create(&lock_path)
        .with_context(|| format!("failed to create lock file {}", lock_path.display()))?;
    if FileExt::try_lock_exclusive(&lock_file).is_err() {
        anyhow::bail!(
            "another `wl run` is already tracking (lock held on {})",
            lock_path.display()
        );
    }

    let mut source = CommandActivitySource::new(&config.idle_command, config.idle_command_unit)
        .context("invalid idle_command")?;
    if let Some(presence) = &config.presence_command {
        source = source.with_presence_command(presence);
    }

    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let tracker = SessionTracker::new(db, Calendar::local(), config.tracker_config())
        .context("failed to recover tracker state")?;
    let handle = TrackerHandle::new(tracker);

    writeln!(
        writer,
        "Tracking into {} (polling every {}s)",
        config.database_path.display(),
        config.poll_interval().as_secs()
    )?;
    writer.flush()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(async {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();

        // Registered before the first tick so an early SIGTERM is not fatal.
        let handlers =
            signals::Signals::register().context("failed to install signal handlers")?;
        let forwarder = tokio::spawn(handlers.forward(events_tx, cancel.clone()));

        run_poll_loop(
            handle.clone(),
            source,
            events_rx,
            config.poll_interval(),
            cancel.clone(),
        )
        .await;

        cancel.cancel();
        if let Err(err) = forwarder.await {
            tracing::warn!(error = %err, "signal task ended abnormally");
        }
        anyhow::Ok(())
    })?;

    match handle.shutdown_blocking(EndReason::Shutdown, config.shutdown_timeout()) {
        Ok(()) => {}
        Err(err @ TrackerError::ShutdownTimedOut(_)) => {
            tracing::warn!(error = %err, "open session left for recovery on next start");
        }
        Err(err) => return Err(err).context("failed to close the session on exit"),
    }

    FileExt::unlock(&lock_file).context("failed to release lock")?;
    writeln!(writer, "Stopped.")?;
    Ok(())
}

#[cfg(unix)]
mod signals {
    use std::io;

    use tokio::signal::unix::{Signal, SignalKind, signal};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use wl_tracker::TrackerEvent;

    /// SIGUSR1 locks, SIGUSR2 unlocks, SIGHUP ends the session, SIGTERM and
    /// SIGINT stop the tracker.
    pub struct Signals {
        lock: Signal,
        unlock: Signal,
        hangup: Signal,
        terminate: Signal,
        interrupt: Signal,
    }

    impl Signals {
        pub fn register() -> io::Result<Self> {
            Ok(Self {
                lock: signal(SignalKind::user_defined1())?,
                unlock: signal(SignalKind::user_defined2())?,
                hangup: signal(SignalKind::hangup())?,
                terminate: signal(SignalKind::terminate())?,
                interrupt: signal(SignalKind::interrupt())?,
            })
        }

        pub async fn forward(
            mut self,
            events: mpsc::Sender<TrackerEvent>,
            cancel: CancellationToken,
        ) {
            loop {
                let event = tokio::select! {
                    () = cancel.cancelled() => return,
                    _ = self.lock.recv() => TrackerEvent::Lock,
                    _ = self.unlock.recv() => TrackerEvent::Unlock,
                    _ = self.hangup.recv() => TrackerEvent::SessionEnding,
                    _ = self.terminate.recv() => TrackerEvent::AppStopping,
                    _ = self.interrupt.recv() => TrackerEvent::AppStopping,
                };
                tracing::info!(%event, "signal received");
                if events.send(event).await.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(not(unix))]
mod signals {
    use std::io;

    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use wl_tracker::TrackerEvent;

    /// Ctrl-C stops the tracker.
    pub struct Signals;

    impl Signals {
        #[expect(
            clippy::unnecessary_wraps,
            reason = "matches the fallible Unix registration"
        )]
        pub const fn register() -> io::Result<Self> {
            Ok(Self)
        }

        pub async fn forward(self, events: mpsc::Sender<TrackerEvent>, cancel: CancellationToken) {
            tokio::select! {
                () = cancel.cancelled() => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        tracing::error!(error = %err, "failed to listen for Ctrl-C");
                        return;
                    }
                    tracing::info!("Ctrl-C received");
                    let _ = events.send(TrackerEvent::AppStopping).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> Config {
        Config {
            database_path: dir.join("worklog.db"),
            idle_command: "echo 0".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn refuses_to_start_while_lock_is_held() {
        let temp = tempfile::tempdir().unwrap();
        let config = config(temp.path());
        let held = File::create(config.lock_path()).unwrap();
        FileExt::try_lock_exclusive(&held).unwrap();

        let err = run(&mut Vec::new(), &config).unwrap_err();
        assert!(err.to_string().contains("already tracking"));
        assert!(!config.database_path.exists());
    }

    #[test]
    fn rejects_empty_idle_command() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            idle_command: "   ".to_string(),
            ..config(temp.path())
        };
        let err = run(&mut Vec::new(), &config).unwrap_err();
        assert!(err.to_string().contains("idle_command"));
    }
}
