//! Configuration management for Perfscope
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `PERFSCOPE__SECTION__KEY` environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "PERFSCOPE";

/// File name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "perfscope.toml";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote service configuration
    pub api: ApiConfig,

    /// Trace session configuration
    pub session: SessionConfig,

    /// Query job configuration
    pub jobs: JobConfig,

    /// Notification configuration
    pub notifications: NotificationConfig,

    /// TUI configuration
    pub tui: TuiConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the trace service API
    pub base_url: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// How a capture session decides that its trace is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessMode {
    /// Release the session once the capture window elapses
    #[default]
    FixedDelay,
    /// Probe the service for trace status, still bounded by the capture window
    Confirm,
}

/// Trace session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fixed interval after which a capture session is released
    #[serde(with = "humantime_serde")]
    pub capture_window: Duration,
    /// Readiness strategy
    pub readiness: ReadinessMode,
    /// Interval between trace status probes in `confirm` mode
    #[serde(with = "humantime_serde")]
    pub readiness_probe_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture_window: Duration::from_secs(15),
            readiness: ReadinessMode::FixedDelay,
            readiness_probe_interval: Duration::from_secs(2),
        }
    }
}

/// Query job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Interval between result polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// How long a notification stays visible
    #[serde(with = "humantime_serde")]
    pub auto_hide: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            auto_hide: Duration::from_secs(6),
        }
    }
}

/// TUI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Redraw tick rate
    #[serde(with = "humantime_serde")]
    pub tick_rate: Duration,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
    /// Directory for dashboard log files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional file and the process environment.
    ///
    /// When `path` is `None` the platform config directory is consulted and
    /// used only if the file exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        Self::from_sources(file.as_deref(), None)
    }

    /// Build configuration from an optional file and an explicit environment map.
    ///
    /// `env` replaces the process environment when provided.
    pub fn from_sources(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| Error::config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = file {
            debug!(path = %path.display(), "Loading configuration file");
            let name = path
                .to_str()
                .ok_or_else(|| Error::config(format!("non UTF-8 path: {}", path.display())))?;
            builder = builder.add_source(config::File::new(name, config::FileFormat::Toml));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .source(env),
        );

        let loaded: Self = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| Error::config(e.to_string()))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Check values that deserialize fine but cannot work at runtime
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url)
            .map_err(|e| Error::config(format!("api.base_url '{}': {e}", self.api.base_url)))?;

        let durations = [
            ("api.request_timeout", self.api.request_timeout),
            ("session.capture_window", self.session.capture_window),
            ("session.readiness_probe_interval", self.session.readiness_probe_interval),
            ("jobs.poll_interval", self.jobs.poll_interval),
            ("notifications.auto_hide", self.notifications.auto_hide),
            ("tui.tick_rate", self.tui.tick_rate),
        ];
        for (key, value) in durations {
            if value.is_zero() {
                return Err(Error::config(format!("{key} must be greater than zero")));
            }
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(Error::config(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Directory used for dashboard log files
    pub fn log_directory(&self) -> PathBuf {
        self.logging
            .directory
            .clone()
            .or_else(|| project_dirs().map(|d| d.data_local_dir().join("logs")))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "perfscope", "perfscope")
}

/// Location of the per-user configuration file
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.capture_window, Duration::from_secs(15));
        assert_eq!(config.jobs.poll_interval, Duration::from_secs(2));
        assert_eq!(config.notifications.auto_hide, Duration::from_secs(6));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = Config::default();
        config.jobs.poll_interval = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jobs.poll_interval"));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_env_overrides_defaults() {
        let env = HashMap::from([
            ("PERFSCOPE__JOBS__POLL_INTERVAL".to_string(), "500ms".to_string()),
            ("PERFSCOPE__SESSION__READINESS".to_string(), "confirm".to_string()),
        ]);

        let config = Config::from_sources(None, Some(env)).unwrap();
        assert_eq!(config.jobs.poll_interval, Duration::from_millis(500));
        assert_eq!(config.session.readiness, ReadinessMode::Confirm);
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
    }
}
