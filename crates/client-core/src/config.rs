//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default API base URL (can be overridden at compile time via CREWGATE_API_BASE_URL).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("CREWGATE_API_BASE_URL") {
    Some(url) => url,
    None => "https://api.crewgate.app",
};

/// Default realtime hub URL (can be overridden at compile time via CREWGATE_HUB_URL).
pub const DEFAULT_HUB_URL: &str = match option_env!("CREWGATE_HUB_URL") {
    Some(url) => url,
    None => "wss://hub.crewgate.app/events",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// REST API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Realtime hub URL.
    #[serde(default = "default_hub_url")]
    pub hub_url: String,
    /// Per-request timeout in seconds for outbound API calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_hub_url() -> String {
    DEFAULT_HUB_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            hub_url: DEFAULT_HUB_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    ///
    /// Endpoint URLs are compile-time only and always use the built-in
    /// defaults, regardless of what's in the config file.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        // Force compile-time endpoints (never from config file)
        config.api_base_url = DEFAULT_API_BASE_URL.to_string();
        config.hub_url = DEFAULT_HUB_URL.to_string();

        // Environment variables can only override log_level
        config.load_from_env();

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Check that the configured endpoints are well-formed.
    pub fn validate(&self) -> CoreResult<()> {
        let api = Url::parse(&self.api_base_url)?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(CoreError::Config(format!(
                "api_base_url must be http(s), got {}",
                self.api_base_url
            )));
        }

        let hub = Url::parse(&self.hub_url)?;
        if !matches!(hub.scheme(), "ws" | "wss") {
            return Err(CoreError::Config(format!(
                "hub_url must be ws(s), got {}",
                self.hub_url
            )));
        }

        Ok(())
    }

    /// Override configuration from environment variables.
    ///
    /// Endpoints are compile-time only; only log_level can be overridden at
    /// runtime.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("CREWGATE_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.hub_url, DEFAULT_HUB_URL);
        assert_eq!(config.request_timeout_secs, 15);
    }

    #[test]
    fn test_default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_schemes() {
        let mut config = Config::default();
        config.api_base_url = "ftp://api.crewgate.app".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.hub_url = "https://hub.crewgate.app".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(temp.path());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(temp.path());

        let mut config = Config::default();
        config.log_level = "debug".to_string();
        config.save(&paths).unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.log_level, "debug");
        // Endpoints are always the compile-time defaults
        assert_eq!(loaded.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(loaded.hub_url, DEFAULT_HUB_URL);
    }

    #[test]
    fn test_load_from_file_partial_fields() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"log_level":"trace"}"#).unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.request_timeout_secs, 15);
    }
}
