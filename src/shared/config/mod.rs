//! Application configuration module
//!
//! Provides the configuration shared by the sync client: where the remote
//! authority lives, how long remote calls may take, how often the background
//! sync runs and where the local database is kept.
//!
//! Configuration can be built in code or loaded from TOML:
//!
//! ```toml
//! server_url = "https://eduflex.example.com"
//! request_timeout_secs = 10
//! sync_interval_secs = 30
//! database_path = "/var/lib/eduflex/offline.db"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server URL
    pub server_url: Option<String>,
    /// Upper bound for every remote call
    pub request_timeout_secs: u64,
    /// Interval of the background level check
    pub sync_interval_secs: u64,
    /// Interval of the connectivity probe
    pub probe_interval_secs: u64,
    /// Local SQLite file; `None` uses the platform data directory
    pub database_path: Option<PathBuf>,
    /// Skip direct writes for this long after one fails; 0 disables
    pub direct_write_cooldown_secs: u64,
    /// Send only the latest entry per video in a sync batch
    pub collapse_sync_batches: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            database_path: None,
            direct_write_cooldown_secs: 0,
            collapse_sync_batches: false,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            let parsed =
                reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", url, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl(format!("unsupported scheme in {}", url)));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("request_timeout_secs must be positive"));
        }
        if self.sync_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("sync_interval_secs must be positive"));
        }
        if self.probe_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("probe_interval_secs must be positive"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn direct_write_cooldown(&self) -> Option<Duration> {
        (self.direct_write_cooldown_secs > 0)
            .then(|| Duration::from_secs(self.direct_write_cooldown_secs))
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.config.sync_interval_secs = interval.as_secs().max(1);
        self
    }

    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.config.probe_interval_secs = interval.as_secs().max(1);
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    pub fn direct_write_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.direct_write_cooldown_secs = cooldown.as_secs();
        self
    }

    pub fn collapse_sync_batches(mut self, collapse: bool) -> Self {
        self.config.collapse_sync_batches = collapse;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}
