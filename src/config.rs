//! Configuration for the Prometheus provider bridge.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Prometheus server settings
    pub prometheus: PrometheusConfig,

    /// Targets to poll
    pub targets: Vec<TargetConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Prometheus server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Base URL of the Prometheus server (e.g., "http://localhost:9090")
    pub url: String,

    /// Default scrape interval in seconds, applied to targets without an override
    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_secs: u64,

    /// Query timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_scrape_interval() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    10
}

/// Configuration for a single polling target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target name (unique within the registry)
    pub name: String,

    /// Value of the `job` label to select
    pub job: String,

    /// Name of the instance label (e.g., "instance")
    pub instance_label: String,

    /// Value of the instance label
    pub instance_value: String,

    /// Device metadata for the published entities
    pub device: DeviceConfig,

    /// Keep only metrics whose name starts with this prefix
    #[serde(default)]
    pub metrics_prefix: Option<String>,

    /// Keep only metrics whose name is in this list (empty list means no restriction)
    #[serde(default)]
    pub included_metrics: Option<Vec<String>>,

    /// Drop metrics whose name is in this list
    #[serde(default)]
    pub excluded_metrics: Vec<String>,

    /// Extra label matchers added to the query selector
    #[serde(default)]
    pub label_filters: HashMap<String, String>,

    /// Per-target scrape interval override in seconds
    #[serde(default)]
    pub scrape_interval_secs: Option<u64>,
}

/// Device metadata attached to a target's entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device identifier (unique within the registry)
    pub id: String,

    /// Display name
    pub name: String,

    /// Manufacturer (default: "Prometheus")
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,

    /// Model
    #[serde(default)]
    pub model: Option<String>,
}

fn default_manufacturer() -> String {
    "Prometheus".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json"
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ProviderConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ProviderConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the integration-level configuration.
    ///
    /// Per-target validation is separate ([`TargetConfig::validate`]) so that
    /// one misconfigured target does not prevent the others from starting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prometheus.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Prometheus URL cannot be empty".to_string(),
            ));
        }

        if self.prometheus.scrape_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scrape_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.targets.is_empty() {
            return Err(ConfigError::Validation(
                "At least one target must be configured".to_string(),
            ));
        }

        Ok(())
    }
}

impl TargetConfig {
    /// Validate this target's required fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Validation(
                "Target name cannot be empty".to_string(),
            ));
        }

        if self.job.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Target '{}': job cannot be empty",
                self.name
            )));
        }

        if self.instance_label.is_empty() || self.instance_value.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Target '{}': instance_label and instance_value are required",
                self.name
            )));
        }

        if self.device.id.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Target '{}': device id cannot be empty",
                self.name
            )));
        }

        if self.device.name.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Target '{}': device name cannot be empty",
                self.name
            )));
        }

        if self.scrape_interval_secs == Some(0) {
            return Err(ConfigError::Validation(format!(
                "Target '{}': scrape_interval_secs must be greater than 0",
                self.name
            )));
        }

        Ok(())
    }

    /// Effective poll interval: the per-target override wins over the global default.
    pub fn scrape_interval(&self, global_secs: u64) -> Duration {
        Duration::from_secs(self.scrape_interval_secs.unwrap_or(global_secs))
    }
}
