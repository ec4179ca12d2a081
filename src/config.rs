//! Startup configuration loaded from a TOML file.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file does not exist or cannot be read.
    Missing(String),
    /// The file parsed but its contents are unusable.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(path) => write!(f, "config file {path} not found"),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Connection settings for the hosted table store.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub base_url: String,
    pub api_key: String,
    /// Restricts every query to one tenant's rows when set.
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Cron expression for the in-process trigger loop. Absent means
    /// generation only runs when an external scheduler hits `POST /run`.
    pub cron: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Config {
    /// Reads and validates the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)
            .map_err(|_| ConfigError::Missing(path.display().to_string()))?;
        Self::parse(&data)
    }

    /// Parses configuration from TOML text.
    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let cfg: Config =
            toml::from_str(data).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if cfg.storage.base_url.is_empty() {
            return Err(ConfigError::Invalid("storage.base_url is missing".to_string()));
        }
        if cfg.storage.api_key.is_empty() {
            return Err(ConfigError::Invalid("storage.api_key is missing".to_string()));
        }
        if let Some(expr) = &cfg.scheduler.cron {
            cron::Schedule::from_str(expr)
                .map_err(|e| ConfigError::Invalid(format!("scheduler.cron: {e}")))?;
        }
        Ok(cfg)
    }
}
