//! Severity levels and rotation granularity

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// Log severity, ordered from most verbose to most important
///
/// A message is written when its severity is at least the configured minimum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Trace,
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// All severities, least important first
    pub const ALL: [Severity; 6] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }

    /// The `tracing` level an event of this severity is emitted at
    ///
    /// `tracing` has no fatal level, so fatal events go out as errors.
    pub fn tracing_level(&self) -> tracing::Level {
        match self {
            Severity::Trace => tracing::Level::TRACE,
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warning => tracing::Level::WARN,
            Severity::Error | Severity::Fatal => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            _ => Err(LogError::InvalidSeverity(s.to_string())),
        }
    }
}

/// How often a new log file is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotationGranularity {
    #[default]
    #[serde(rename = "daily", alias = "days")]
    Daily,
    #[serde(rename = "hourly", alias = "hours")]
    Hourly,
}

impl RotationGranularity {
    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationGranularity::Daily => "Days",
            RotationGranularity::Hourly => "Hours",
        }
    }

    /// Length of one rotation period
    pub fn interval(&self) -> Duration {
        match self {
            RotationGranularity::Daily => Duration::from_secs(24 * 60 * 60),
            RotationGranularity::Hourly => Duration::from_secs(60 * 60),
        }
    }
}

impl fmt::Display for RotationGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotationGranularity {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "days" | "day" => Ok(RotationGranularity::Daily),
            "hourly" | "hours" | "hour" => Ok(RotationGranularity::Hourly),
            _ => Err(LogError::InvalidGranularity(s.to_string())),
        }
    }
}
