use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration value: {0}")]
    Validation(String),
}

/// Configuration for the LogSentinel daemon and CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Watched directory configuration
    pub input: InputConfig,
    /// Burst detection configuration
    pub detection: DetectionConfig,
    /// Alert store configuration
    pub persistence: PersistenceConfig,
    /// Notification configuration
    pub alerting: AlertConfig,
    /// Report output configuration
    pub output: OutputConfig,
}

/// Watched directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory polled for newly added log files
    pub watch_dir: PathBuf,
    /// Poll interval in milliseconds
    pub poll_interval_ms: u64,
}

/// Burst detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Number of consecutive failures that make up a burst
    pub threshold: usize,
    /// Maximum span of a burst window in seconds
    pub max_window_seconds: f64,
    /// Year attached to syslog timestamps, which carry none.
    /// Falls back to the current UTC year when unset.
    #[serde(default)]
    pub reference_year: Option<i32>,
    /// Number of raw lines echoed back in a run result
    pub preview_lines: usize,
}

/// Alert store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the SQLite database
    pub db_path: PathBuf,
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub enabled: bool,
    /// Recipient used when a run does not name one
    #[serde(default)]
    pub default_recipient: Option<String>,
    #[serde(default)]
    pub slack: Option<SlackConfig>,
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub url: String,
    /// "POST" (default) or "PUT"
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format: "json", "jsonl", or "console"
    pub format: String,
    /// Output file path (stdout when unset)
    pub file_path: Option<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            threshold: 5,
            max_window_seconds: 60.0,
            reference_year: None,
            preview_lines: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: InputConfig {
                watch_dir: PathBuf::from("watched-logs"),
                poll_interval_ms: 1000,
            },
            detection: DetectionConfig::default(),
            persistence: PersistenceConfig {
                db_path: PathBuf::from("logsentinel.db"),
            },
            alerting: AlertConfig {
                enabled: true,
                default_recipient: None,
                slack: None,
                webhooks: Vec::new(),
            },
            output: OutputConfig {
                format: "jsonl".to_string(),
                file_path: None,
            },
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::Validation(
                "detection.threshold must be at least 1".to_string(),
            ));
        }
        if !self.max_window_seconds.is_finite() || self.max_window_seconds < 0.0 {
            return Err(ConfigError::Validation(format!(
                "detection.max_window_seconds must be a non-negative number, got {}",
                self.max_window_seconds
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_detection_values() {
        let config = Config::default();
        assert_eq!(config.detection.threshold, 5);
        assert_eq!(config.detection.max_window_seconds, 60.0);
        assert_eq!(config.detection.preview_lines, 10);
        assert!(config.detection.reference_year.is_none());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.detection.reference_year = Some(2024);
        config.alerting.default_recipient = Some("ops@example.com".to_string());
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.detection.reference_year, Some(2024));
        assert_eq!(
            loaded.alerting.default_recipient.as_deref(),
            Some("ops@example.com")
        );
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = Config::default();
        config.detection.threshold = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_negative_window_rejected() {
        let mut config = Config::default();
        config.detection.max_window_seconds = -1.0;
        assert!(config.validate().is_err());

        config.detection.max_window_seconds = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "detection = 12").unwrap();

        assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
    }
}
