use std::path::PathBuf;
use std::time::Duration;

use crate::client::local_db::LocalDatabase;
use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError, DEFAULT_SERVER_URL};

/// Environment variable overriding the server URL
pub const ENV_API_URL: &str = "CLIENT_API_URL";
/// Environment variable overriding the local database path
pub const ENV_DB_PATH: &str = "EDUFLEX_DB_PATH";
/// Environment variable providing a bearer token
pub const ENV_TOKEN: &str = "EDUFLEX_TOKEN";

/// Client configuration wrapper.
///
/// Adds the bearer token and environment overrides on top of [`AppConfig`].
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Config {
    pub fn new(app: AppConfig) -> Self {
        Self { app, token: None }
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self::new(builder.build()?))
    }

    /// Default configuration with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(AppConfig::default()).apply_env()
    }

    /// Apply `CLIENT_API_URL`, `EDUFLEX_DB_PATH` and `EDUFLEX_TOKEN`
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            self.app.server_url = Some(url);
        }
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            self.app.database_path = Some(PathBuf::from(path));
        }
        if let Ok(token) = std::env::var(ENV_TOKEN) {
            if !token.is_empty() {
                self.token = Some(token);
            }
        }
        self.app.validate()?;
        Ok(self)
    }

    /// Set the JWT token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the JWT token
    pub fn get_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url().trim_end_matches('/'), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn database_path(&self) -> PathBuf {
        self.app
            .database_path
            .clone()
            .unwrap_or_else(LocalDatabase::default_db_path)
    }

    pub fn request_timeout(&self) -> Duration {
        self.app.request_timeout()
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(ENV_API_URL);
        std::env::remove_var(ENV_DB_PATH);
        std::env::remove_var(ENV_TOKEN);
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.server_url(), "http://127.0.0.1:3000");
        assert!(config.get_token().is_none());
    }

    #[test]
    #[serial]
    fn test_config_env_overrides() {
        clear_env();
        std::env::set_var(ENV_API_URL, "http://10.0.0.5:8080");
        std::env::set_var(ENV_DB_PATH, "/tmp/eduflex-test.db");
        std::env::set_var(ENV_TOKEN, "env-token");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.server_url(), "http://10.0.0.5:8080");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/eduflex-test.db"));
        assert_eq!(config.get_token(), Some("env-token"));
    }

    #[test]
    #[serial]
    fn test_config_rejects_bad_env_url() {
        clear_env();
        std::env::set_var(ENV_API_URL, "::not-a-url::");
        let result = Config::from_env();
        clear_env();
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_token_lifecycle() {
        let mut config = Config::new(AppConfig::default());
        config.set_token(Some("test_token".to_string()));
        assert_eq!(config.get_token(), Some("test_token"));
        config.clear_token();
        assert!(config.get_token().is_none());
    }

    #[test]
    fn test_api_url() {
        let config = Config::with_builder(AppConfig::builder().server_url("http://localhost:3000/"))
            .unwrap();
        assert_eq!(config.api_url("/api/progress"), "http://localhost:3000/api/progress");
    }
}
