//! # Application configuration: `taskmaster.toml`
//!
//! ```toml
//! [store]
//! path = "/var/lib/taskmaster/taskmaster.sqlite3"
//!
//! [logging]
//! level = "info"
//! dir = "/var/log/taskmaster"
//!
//! [reminders]
//! poll_interval_secs = 30
//! notification_title = "TaskMaster Reminder"
//! body_preview_chars = 100
//!
//! [tasks]
//! default_color = "#3B82F6"
//! ```
//!
//! Every section is optional; a missing or empty file is equivalent to
//! [`AppConfig::default`].

use crate::logging::default_log_level;
use crate::model::task::DEFAULT_TASK_COLOR;
use crate::model::validation::is_hex_color;
use crate::notify::{DEFAULT_BODY_PREVIEW_CHARS, DEFAULT_REMINDER_TITLE};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "taskmaster.toml";

const DEFAULT_STORE_FILE_NAME: &str = "taskmaster.sqlite3";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Config load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
}

/// Row store location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite file path. Relative paths resolve against the working directory.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Logging backend settings. `dir = None` keeps file logging off.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
        }
    }
}

/// Reminder scan and notification settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Seconds between periodic scans. Must be > 0.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_notification_title")]
    pub notification_title: String,
    #[serde(default = "default_body_preview_chars")]
    pub body_preview_chars: usize,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            notification_title: default_notification_title(),
            body_preview_chars: default_body_preview_chars(),
        }
    }
}

impl ReminderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Task defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_task_color")]
    pub default_color: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            default_color: default_task_color(),
        }
    }
}

impl AppConfig {
    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Like [`AppConfig::load`], but a missing file yields defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reminders.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "reminders.poll_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.reminders.notification_title.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "reminders.notification_title must not be blank".to_string(),
            ));
        }
        if !is_hex_color(self.tasks.default_color.trim()) {
            return Err(ConfigError::Invalid(format!(
                "tasks.default_color must be #RRGGBB, got `{}`",
                self.tasks.default_color
            )));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_FILE_NAME)
}

fn default_level() -> String {
    default_log_level().to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_notification_title() -> String {
    DEFAULT_REMINDER_TITLE.to_string()
}

fn default_body_preview_chars() -> usize {
    DEFAULT_BODY_PREVIEW_CHARS
}

fn default_task_color() -> String {
    DEFAULT_TASK_COLOR.to_string()
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use std::time::Duration;

    #[test]
    fn empty_text_is_default_config() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.reminders.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.reminders.notification_title, "TaskMaster Reminder");
        assert_eq!(config.reminders.body_preview_chars, 100);
        assert_eq!(config.tasks.default_color, "#3B82F6");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [reminders]
            poll_interval_secs = 5

            [logging]
            level = "debug"
            dir = "/tmp/taskmaster-logs"
            "#,
        )
        .unwrap();
        assert_eq!(config.reminders.poll_interval_secs, 5);
        assert_eq!(config.reminders.body_preview_chars, 100);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.dir.is_some());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = AppConfig::from_toml_str("[reminders]\npoll_interval_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("poll_interval")));
    }

    #[test]
    fn bad_color_is_rejected() {
        let err = AppConfig::from_toml_str("[tasks]\ndefault_color = \"blue\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = AppConfig::from_toml_str("[reminders\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn serialized_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(super::CONFIG_FILE_NAME);
        let mut config = AppConfig::default();
        config.reminders.poll_interval_secs = 12;
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }
}
