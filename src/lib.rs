//! Prometheus provider bridge.
//!
//! Polls a Prometheus instant-query API on a fixed interval per configured
//! target, filters the returned series down to the target's configured
//! subset, assigns each series a stable key, infers display semantics from
//! the metric name, and maintains a per-target map of normalized samples
//! for a sensor-publishing layer to consume:
//!
//! - [`client`] - Prometheus API client (`PrometheusClient`, `Selector`)
//! - [`filter`] - Metric-name filtering (prefix, include-list, exclude-list)
//! - [`series`] - Sample model and stable key derivation
//! - [`classify`] - Unit/category/statistic-kind inference from metric names
//! - [`coordinator`] - Per-target poll lifecycle and change notification
//! - [`registry`] - The set of registered targets
//! - [`entity`] - Sensor entity descriptions and states
//! - [`config`] - Configuration loading (JSON5 format)

pub mod classify;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod filter;
pub mod registry;
pub mod series;

// Re-export commonly used types at the crate root
pub use classify::{Category, Icon, SeriesClass, StatisticKind, Unit, classify};
pub use client::{FetchError, PrometheusClient, QueryApi, Selector};
pub use config::{ConfigError, LogFormat, LoggingConfig, ProviderConfig, TargetConfig};
pub use coordinator::{PollCoordinator, SampleMap, Snapshot};
pub use entity::{SensorDescription, SensorState};
pub use filter::SeriesFilter;
pub use registry::TargetRegistry;
pub use series::{NAME_LABEL, NormalizedSample, RawSample, derive_key};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| {
                    ConfigError::Logging(format!("Failed to initialize tracing: {}", e))
                })?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| {
                    ConfigError::Logging(format!("Failed to initialize tracing: {}", e))
                })?;
        }
    }

    Ok(())
}
