//! Start and end reasons as the single source of truth for reason strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an interval was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StartReason {
    /// A genuine session start.
    #[default]
    NormalStart,
    /// The synthetic second half of a session that crossed midnight.
    SplitContinuation,
}

impl StartReason {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NormalStart => "normal_start",
            Self::SplitContinuation => "split_continuation",
        }
    }
}

impl fmt::Display for StartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StartReason {
    type Err = ReasonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal_start" => Ok(Self::NormalStart),
            "split_continuation" => Ok(Self::SplitContinuation),
            _ => Err(ReasonParseError(s.to_string())),
        }
    }
}

/// Why an interval was closed.
///
/// `SplitBoundary` is the only reason with structural meaning: an interval
/// closed with it is always followed by a `SplitContinuation` interval that
/// starts at exactly the same instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum EndReason {
    /// Generic end of a session.
    #[default]
    NormalEnd,
    /// Closed at 23:59:59 because the session crossed midnight.
    SplitBoundary,
    /// The idle signal exceeded the timeout.
    IdleTimeout,
    /// The OS session was locked.
    Lock,
    /// The machine went to sleep.
    Sleep,
    /// The OS session is ending or the app is stopping.
    Shutdown,
    /// The process is exiting.
    ProcessExit,
    /// An external caller asked for the session to end.
    ApiRequest,
    /// Any reason not known to this build.
    Other(String),
}

impl EndReason {
    /// String representation for database storage.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NormalEnd => "normal_end",
            Self::SplitBoundary => "split_boundary",
            Self::IdleTimeout => "idle_timeout",
            Self::Lock => "lock",
            Self::Sleep => "sleep",
            Self::Shutdown => "shutdown",
            Self::ProcessExit => "process_exit",
            Self::ApiRequest => "api_request",
            Self::Other(reason) => reason,
        }
    }

    /// Builds a reason from free text, mapping known tags to their variant.
    #[must_use]
    pub fn other(reason: impl Into<String>) -> Self {
        Self::Other(reason.into()).canonical()
    }

    /// Replaces an `Other` whose text is a known tag with that variant, so
    /// the stored string always parses back to the same reason.
    #[must_use]
    pub fn canonical(self) -> Self {
        match self {
            Self::Other(reason) => reason.parse().unwrap_or(Self::Other(reason)),
            known => known,
        }
    }

    /// Whether a caller may end a session with this reason.
    ///
    /// `SplitBoundary` is written only by midnight splits, and an empty tag
    /// cannot be stored.
    #[must_use]
    pub fn is_requestable(&self) -> bool {
        match self {
            Self::SplitBoundary => false,
            Self::Other(reason) => !reason.is_empty(),
            _ => true,
        }
    }

    /// Reason used for the post-midnight remainder of a split session.
    ///
    /// An idle timeout is attributed to the pre-midnight half only; the
    /// remainder closes with [`EndReason::NormalEnd`].
    #[must_use]
    pub fn for_continuation(&self) -> Self {
        match self {
            Self::IdleTimeout => Self::NormalEnd,
            other => other.clone(),
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndReason {
    type Err = ReasonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reason = match s {
            "" => return Err(ReasonParseError(String::new())),
            "normal_end" => Self::NormalEnd,
            "split_boundary" => Self::SplitBoundary,
            "idle_timeout" => Self::IdleTimeout,
            "lock" => Self::Lock,
            "sleep" => Self::Sleep,
            "shutdown" => Self::Shutdown,
            "process_exit" => Self::ProcessExit,
            "api_request" => Self::ApiRequest,
            other => Self::Other(other.to_string()),
        };
        Ok(reason)
    }
}

macro_rules! string_serde {
    ($name:ty) => {
        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(StartReason);
string_serde!(EndReason);

/// Error type for reason strings that cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid reason: {0:?}")]
pub struct ReasonParseError(pub String);
