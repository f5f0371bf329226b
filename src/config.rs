//! Configuration loading and management for docsumma.
//!
//! Loads settings from `docsumma.toml` with environment variable overrides for
//! the service endpoint and key.

use crate::client::PollPolicy;
use crate::credentials::Credentials;
use crate::summary::{SummaryLength, DEFAULT_LANGUAGE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENDPOINT_ENV: &str = "AZURE_LANGUAGE_ENDPOINT";
pub const API_KEY_ENV: &str = "AZURE_LANGUAGE_KEY";

const CONFIG_FILE: &str = "docsumma.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Language service request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Language code sent with every document
    pub language: String,
    /// Length used when none is given on the command line
    pub default_length: SummaryLength,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

/// Poll loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

/// Credential overrides (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

/// Storage paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base path for the credential store
    pub path: PathBuf,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the default location (docsumma.toml in cwd or home).
    /// Falls back to defaults when neither file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::parse_file(&path)?,
            None => Config::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::parse_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            self.api.endpoint = Some(endpoint);
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            self.api.key = Some(key);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "polling.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.service.language.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "service.language must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::home_dir()
            .map(|home| home.join(".config").join("docsumma").join(CONFIG_FILE))
            .filter(|path| path.exists())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.polling.max_attempts,
            delay: Duration::from_millis(self.polling.delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.request_timeout_secs)
    }

    /// Credentials from the environment, when both values are set
    pub fn env_credentials(&self) -> Option<Credentials> {
        let endpoint = self.api.endpoint.as_deref()?;
        let key = self.api.key.as_deref()?;
        Credentials::new(endpoint, key).ok()
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.storage.path.join("credentials")
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            default_length: SummaryLength::default(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            delay_ms: policy.delay.as_millis() as u64,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|dir| dir.join("docsumma"))
            .unwrap_or_else(|| PathBuf::from("./data"));
        Self { path }
    }
}
