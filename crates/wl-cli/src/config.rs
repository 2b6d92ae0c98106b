//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{ParseWeekdayError, Weekday};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wl_tracker::{IdleUnit, TrackerConfig};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Seconds between idle polls.
    pub poll_interval_secs: u64,
    pub activity_threshold_secs: u64,
    pub idle_timeout_secs: u64,
    /// First day of the week for `wl week`, e.g. `"sunday"` or `"mon"`.
    pub week_start: String,
    /// How long `wl run` waits for the final session close on exit.
    pub shutdown_timeout_ms: u64,
    /// Command printing idle time, e.g. `xprintidle`.
    pub idle_command: String,
    pub idle_command_unit: IdleUnit,
    /// Command whose zero exit status asserts presence.
    pub presence_command: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("week_start", &self.week_start)
            .field("idle_command", &self.idle_command)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let tracker = TrackerConfig::default();
        Self {
            database_path: data_dir.join("worklog.db"),
            poll_interval_secs: 5,
            activity_threshold_secs: tracker.activity_threshold_secs,
            idle_timeout_secs: tracker.idle_timeout_secs,
            week_start: "sunday".to_string(),
            shutdown_timeout_ms: 3000,
            idle_command: "xprintidle".to_string(),
            idle_command_unit: IdleUnit::Milliseconds,
            presence_command: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // WL_DATABASE_PATH, WL_IDLE_TIMEOUT_SECS, ...
        figment = figment.merge(Env::prefixed("WL_"));

        figment.extract()
    }

    pub const fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            activity_threshold_secs: self.activity_threshold_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }

    pub fn week_start(&self) -> Result<Weekday, ParseWeekdayError> {
        self.week_start.parse()
    }

    pub const fn poll_interval(&self) -> Duration {
        // A zero interval would make tokio's ticker panic.
        let secs = if self.poll_interval_secs == 0 {
            1
        } else {
            self.poll_interval_secs
        };
        Duration::from_secs(secs)
    }

    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Single-instance lock file, kept beside the database.
    pub fn lock_path(&self) -> PathBuf {
        self.database_path.with_extension("lock")
    }
}

/// Returns the platform-specific config directory for worklog.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("worklog"))
}

/// Returns the platform-specific data directory for worklog.
///
/// On Linux: `~/.local/share/worklog`
fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("worklog"))
}
