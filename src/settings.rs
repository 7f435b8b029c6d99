//! Logging configuration
//!
//! [`LogSettings`] is both the configuration snapshot held by a registry and
//! the on-disk TOML format hosts can load it from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};
use crate::registry::LogRegistry;
use crate::rotation::RotationPolicy;
use crate::severity::{RotationGranularity, Severity};

/// Environment variable overriding the minimum severity
pub const ENV_LEVEL: &str = "SVCLOG_LEVEL";
/// Environment variable overriding the output directory
pub const ENV_DIR: &str = "SVCLOG_DIR";
/// Environment variable switching file output on or off
pub const ENV_FILE_OUTPUT: &str = "SVCLOG_FILE_OUTPUT";

/// Directory used for file output when none is configured
///
/// `/var/log` on Linux servers, `./logs` everywhere else.
pub fn default_output_directory() -> &'static str {
    if cfg!(target_os = "linux") {
        "/var/log"
    } else {
        "./logs"
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Project name, used for the log directory and file names
    #[serde(default)]
    pub project_name: String,

    /// Write to rotated files instead of the console
    #[serde(default)]
    pub enable_file_output: bool,

    /// Base directory for log files; empty means the platform default
    #[serde(default)]
    pub output_directory: String,

    /// Least important severity that is still written (default: trace)
    #[serde(default)]
    pub min_severity: Severity,

    /// Days a rotated file is kept; zero or less keeps files forever (default: 7)
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// How often a new file is started (default: daily)
    #[serde(default)]
    pub rotation: RotationGranularity,
}

fn default_retention_days() -> i64 {
    7
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            enable_file_output: false,
            output_directory: String::new(),
            min_severity: Severity::default(),
            retention_days: default_retention_days(),
            rotation: RotationGranularity::default(),
        }
    }
}

impl LogSettings {
    /// Load settings from a TOML file, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| LogError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| LogError::ParseSettings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save settings to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| LogError::WriteSettings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `SVCLOG_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(level) = lookup(ENV_LEVEL) {
            self.min_severity = level.parse()?;
        }
        if let Some(dir) = lookup(ENV_DIR) {
            self.output_directory = dir;
        }
        if let Some(flag) = lookup(ENV_FILE_OUTPUT) {
            self.enable_file_output = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(self)
    }

    /// The directory file output goes to, with the platform default applied
    pub fn effective_output_directory(&self) -> &str {
        if self.output_directory.is_empty() {
            default_output_directory()
        } else {
            &self.output_directory
        }
    }

    /// Rotation policy these settings describe, `None` in console mode
    ///
    /// Pure computation, nothing is created on disk.
    pub fn rotation_policy(&self) -> Option<RotationPolicy> {
        if !self.enable_file_output {
            return None;
        }
        let dir = PathBuf::from(shellexpand::tilde(self.effective_output_directory()).as_ref());
        Some(RotationPolicy::for_project(
            &dir,
            &self.project_name,
            self.rotation,
            self.retention_days,
        ))
    }

    /// Configure `registry` with these settings
    pub fn apply(&self, registry: &LogRegistry) -> Result<()> {
        registry.setup(
            &self.project_name,
            self.enable_file_output,
            &self.output_directory,
            self.min_severity,
            self.retention_days,
            self.rotation,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = LogSettings::default();
        assert!(!settings.enable_file_output);
        assert_eq!(settings.min_severity, Severity::Trace);
        assert_eq!(settings.retention_days, 7);
        assert_eq!(settings.rotation, RotationGranularity::Daily);
        assert!(settings.rotation_policy().is_none());
    }

    #[test]
    fn test_settings_serialization() {
        let settings = LogSettings {
            project_name: "Demo".to_string(),
            enable_file_output: true,
            output_directory: "/srv/logs".to_string(),
            min_severity: Severity::Warning,
            retention_days: 3,
            rotation: RotationGranularity::Hourly,
        };
        let toml_str = toml::to_string(&settings).unwrap();
        assert!(toml_str.contains("min_severity = \"warning\""));
        assert!(toml_str.contains("rotation = \"hourly\""));
        let parsed: LogSettings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let parsed: LogSettings =
            toml::from_str("project_name = \"Svc\"\nmin_severity = \"warn\"").unwrap();
        assert_eq!(parsed.project_name, "Svc");
        assert_eq!(parsed.min_severity, Severity::Warning);
        assert_eq!(parsed.retention_days, 7);
        assert_eq!(parsed.rotation, RotationGranularity::Daily);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let settings = LogSettings::load(&temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(settings, LogSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logging.toml");
        let settings = LogSettings {
            project_name: "Demo".to_string(),
            rotation: RotationGranularity::Hourly,
            ..LogSettings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(LogSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logging.toml");
        std::fs::write(&path, "min_severity = \"loud\"").unwrap();
        let err = LogSettings::load(&path).unwrap_err();
        assert!(matches!(err, LogError::ParseSettings { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_LEVEL, "error"),
            (ENV_DIR, "/tmp/svc"),
            (ENV_FILE_OUTPUT, "yes"),
        ]);
        let settings = LogSettings::default()
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.min_severity, Severity::Error);
        assert_eq!(settings.output_directory, "/tmp/svc");
        assert!(settings.enable_file_output);
    }

    #[test]
    fn test_invalid_level_override() {
        let result = LogSettings::default()
            .with_overrides(|key| (key == ENV_LEVEL).then(|| "chatty".to_string()));
        assert!(matches!(result, Err(LogError::InvalidSeverity(_))));
    }

    #[test]
    fn test_rotation_policy_with_default_directory() {
        let settings = LogSettings {
            project_name: "Demo".to_string(),
            enable_file_output: true,
            min_severity: Severity::Warning,
            retention_days: 7,
            rotation: RotationGranularity::Hourly,
            ..LogSettings::default()
        };
        let policy = settings.rotation_policy().unwrap();
        let dir = default_output_directory();

        assert_eq!(settings.effective_output_directory(), dir);
        assert_eq!(policy.pattern(), format!("{}/demo/run_Demo.%Y%m%d%H%M", dir));
        assert_eq!(policy.link, Path::new(dir).join("demo").join("run_Demo"));
        assert_eq!(policy.interval, Duration::from_secs(3600));
        assert_eq!(policy.max_age, Some(Duration::from_secs(7 * 24 * 3600)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_default_directory_on_linux() {
        assert_eq!(default_output_directory(), "/var/log");
    }
}
