//! Activity signal sources.
//!
//! The tracker only needs two facts per tick: how long the user has been idle,
//! and whether something else (media playback, a keep-awake request) asserts
//! presence regardless of input. Native detection lives outside this crate;
//! [`CommandActivitySource`] shells out to a helper such as `xprintidle`.

use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading the idle signal.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("idle command is empty")]
    EmptyCommand,
    #[error("failed to run {command:?}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{command:?} exited with {status}")]
    Failed { command: String, status: ExitStatus },
    #[error("{command:?} printed {output:?}, expected a non-negative integer")]
    Parse { command: String, output: String },
    #[error("idle read did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("an earlier idle read is still running")]
    Busy,
}

/// Unit of the number printed by an idle command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleUnit {
    #[default]
    Seconds,
    Milliseconds,
}

/// Source of the idle signal and the presence override.
pub trait ActivitySource {
    /// Seconds since the last user input.
    fn idle_seconds(&mut self) -> Result<u64, SourceError>;

    /// Whether presence is asserted independently of input.
    fn presence_asserted(&mut self) -> bool {
        false
    }
}

/// Reads the idle signal by running an external command.
#[derive(Debug, Clone)]
pub struct CommandActivitySource {
    idle_command: Vec<String>,
    unit: IdleUnit,
    presence_command: Option<Vec<String>>,
}

impl CommandActivitySource {
    /// `idle_command` is split on whitespace, e.g. `"xprintidle"`.
    pub fn new(idle_command: &str, unit: IdleUnit) -> Result<Self, SourceError> {
        let idle_command = split_command(idle_command);
        if idle_command.is_empty() {
            return Err(SourceError::EmptyCommand);
        }
        Ok(Self {
            idle_command,
            unit,
            presence_command: None,
        })
    }

    /// Adds a command whose zero exit status asserts presence.
    #[must_use]
    pub fn with_presence_command(mut self, command: &str) -> Self {
        let command = split_command(command);
        self.presence_command = (!command.is_empty()).then_some(command);
        self
    }
}

impl ActivitySource for CommandActivitySource {
    fn idle_seconds(&mut self) -> Result<u64, SourceError> {
        let display = self.idle_command.join(" ");
        let (program, args) = self
            .idle_command
            .split_first()
            .ok_or(SourceError::EmptyCommand)?;
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SourceError::Spawn {
                command: display.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(SourceError::Failed {
                command: display,
                status: output.status,
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_idle(&stdout, self.unit).ok_or_else(|| SourceError::Parse {
            command: display,
            output: stdout.trim().to_string(),
        })
    }

    fn presence_asserted(&mut self) -> bool {
        let Some((program, args)) = self
            .presence_command
            .as_deref()
            .and_then(<[String]>::split_first)
        else {
            return false;
        };
        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(err) => {
                tracing::warn!(command = %program, error = %err, "presence command failed");
                false
            }
        }
    }
}

/// Constant readings, for dry runs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedActivitySource {
    pub idle_seconds: u64,
    pub presence: bool,
}

impl FixedActivitySource {
    pub const fn new(idle_seconds: u64) -> Self {
        Self {
            idle_seconds,
            presence: false,
        }
    }
}

impl ActivitySource for FixedActivitySource {
    fn idle_seconds(&mut self) -> Result<u64, SourceError> {
        Ok(self.idle_seconds)
    }

    fn presence_asserted(&mut self) -> bool {
        self.presence
    }
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

fn parse_idle(output: &str, unit: IdleUnit) -> Option<u64> {
    let value: u64 = output.trim().parse().ok()?;
    Some(match unit {
        IdleUnit::Seconds => value,
        IdleUnit::Milliseconds => value / 1000,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_idle_units() {
        assert_eq!(parse_idle("42\n", IdleUnit::Seconds), Some(42));
        assert_eq!(parse_idle(" 4999 ", IdleUnit::Milliseconds), Some(4));
        assert_eq!(parse_idle("-3", IdleUnit::Seconds), None);
        assert_eq!(parse_idle("idle", IdleUnit::Seconds), None);
        assert_eq!(parse_idle("", IdleUnit::Seconds), None);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(
            CommandActivitySource::new("   ", IdleUnit::Seconds),
            Err(SourceError::EmptyCommand)
        ));
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let mut source =
            CommandActivitySource::new("wl-definitely-not-a-real-binary", IdleUnit::Seconds)
                .unwrap();
        assert!(matches!(
            source.idle_seconds(),
            Err(SourceError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn command_output_is_parsed() {
        let mut source = CommandActivitySource::new("echo 12000", IdleUnit::Milliseconds).unwrap();
        assert_eq!(source.idle_seconds().unwrap(), 12);
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_reported() {
        let mut source = CommandActivitySource::new("false", IdleUnit::Seconds).unwrap();
        assert!(matches!(
            source.idle_seconds(),
            Err(SourceError::Failed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn presence_follows_exit_status() {
        let mut source = CommandActivitySource::new("echo 0", IdleUnit::Seconds).unwrap();
        assert!(!source.presence_asserted());
        assert!(source.clone().with_presence_command("true").presence_asserted());
        assert!(!source.with_presence_command("false").presence_asserted());
    }
}
