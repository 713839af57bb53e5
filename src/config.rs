use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{GmailError, Result};
use crate::label_guard::is_quotable;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub purge: PurgeConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeConfig {
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Maximum messages per run; 0 means no limit
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub protect_labels: Vec<String>,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            page_size: default_page_size(),
            limit: 0,
            protect_labels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    #[serde(default = "default_transient_status_codes")]
    pub transient_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            transient_status_codes: default_transient_status_codes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Pause after this many processed messages
    #[serde(default = "default_pause_every")]
    pub pause_every: usize,
    #[serde(default = "default_pause_millis")]
    pub pause_millis: u64,
    /// Log a progress line after this many processed messages
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl ThrottleConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_millis)
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            pause_every: default_pause_every(),
            pause_millis: default_pause_millis(),
            progress_every: default_progress_every(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_units_per_second")]
    pub units_per_second: u32,
    #[serde(default = "default_burst_units")]
    pub burst_units: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            units_per_second: default_units_per_second(),
            burst_units: default_burst_units(),
        }
    }
}

fn default_query() -> String {
    "older_than:10y in:inbox".to_string()
}

fn default_page_size() -> u32 {
    500
}

fn default_max_attempts() -> u32 {
    6
}

fn default_base_delay_secs() -> u64 {
    1
}

fn default_max_delay_secs() -> u64 {
    60
}

fn default_transient_status_codes() -> Vec<u16> {
    vec![403, 429, 500, 503]
}

fn default_pause_every() -> usize {
    200
}

fn default_pause_millis() -> u64 {
    1000
}

fn default_progress_every() -> usize {
    500
}

fn default_units_per_second() -> u32 {
    250
}

fn default_burst_units() -> u32 {
    500
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| GmailError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GmailError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GmailError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.purge.query.trim().is_empty() {
            return Err(GmailError::ConfigError(
                "purge.query cannot be empty".to_string(),
            ));
        }

        // messages.list rejects maxResults above 500
        if self.purge.page_size == 0 || self.purge.page_size > 500 {
            return Err(GmailError::ConfigError(
                "purge.page_size must be between 1 and 500".to_string(),
            ));
        }

        if self.purge.protect_labels.iter().any(|l| l.trim().is_empty()) {
            return Err(GmailError::ConfigError(
                "purge.protect_labels cannot contain empty strings".to_string(),
            ));
        }
        if let Some(label) = self.purge.protect_labels.iter().find(|l| !is_quotable(l)) {
            return Err(GmailError::ConfigError(format!(
                "purge.protect_labels entry {:?} cannot contain a double quote",
                label
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(GmailError::ConfigError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay_secs == 0 {
            return Err(GmailError::ConfigError(
                "retry.base_delay_secs must be at least 1".to_string(),
            ));
        }
        if self.retry.max_delay_secs < self.retry.base_delay_secs {
            return Err(GmailError::ConfigError(
                "retry.max_delay_secs cannot be lower than retry.base_delay_secs".to_string(),
            ));
        }
        if let Some(code) = self
            .retry
            .transient_status_codes
            .iter()
            .find(|c| !(100..=599).contains(*c))
        {
            return Err(GmailError::ConfigError(format!(
                "retry.transient_status_codes contains invalid HTTP status {}",
                code
            )));
        }

        if self.throttle.pause_every == 0 {
            return Err(GmailError::ConfigError(
                "throttle.pause_every must be greater than 0".to_string(),
            ));
        }
        if self.throttle.progress_every == 0 {
            return Err(GmailError::ConfigError(
                "throttle.progress_every must be greater than 0".to_string(),
            ));
        }

        if self.quota.units_per_second == 0 {
            return Err(GmailError::ConfigError(
                "quota.units_per_second must be greater than 0".to_string(),
            ));
        }
        // must hold at least one messages.delete (10 units)
        if self.quota.burst_units < 10 {
            return Err(GmailError::ConfigError(
                "quota.burst_units must be at least 10".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}
