//! Error type for setup and configuration

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced while configuring logging
///
/// Emission itself never fails visibly; only setup and settings loading do.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to create log directory {path}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open log file {path}")]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read settings file {path}")]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}")]
    ParseSettings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write settings file {path}")]
    WriteSettings {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize settings")]
    SerializeSettings(#[from] toml::ser::Error),

    #[error("unknown severity '{0}'")]
    InvalidSeverity(String),

    #[error("unknown rotation granularity '{0}'")]
    InvalidGranularity(String),
}

pub type Result<T> = std::result::Result<T, LogError>;
