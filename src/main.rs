//! Prometheus provider bridge.
//!
//! Polls Prometheus targets on fixed intervals and maintains, per target,
//! a map of normalized samples for a sensor-publishing layer to consume.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use prometheus_provider::client::PrometheusClient;
use prometheus_provider::config::ProviderConfig;
use prometheus_provider::coordinator::PollCoordinator;
use prometheus_provider::registry::TargetRegistry;

/// Polls Prometheus targets and exposes each time series as a sensor entity.
#[derive(Parser, Debug)]
#[command(name = "prometheus-provider")]
#[command(about = "Polls Prometheus targets and exposes each series as a sensor entity")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "prometheus.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = ProviderConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    prometheus_provider::init_tracing(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting prometheus-provider");
    info!("Loaded configuration from {:?}", args.config);

    let http = reqwest::Client::new();
    let timeout = Duration::from_secs(config.prometheus.timeout_secs);
    let mut registry = TargetRegistry::new();

    // Register a coordinator per target. A misconfigured target is fatal
    // to that target only; the others continue.
    for target in std::mem::take(&mut config.targets) {
        if let Err(e) = target.validate() {
            error!(target = %target.name, error = %e, "Skipping misconfigured target");
            continue;
        }

        let client = PrometheusClient::new(http.clone(), &config.prometheus.url, timeout);
        let interval = target.scrape_interval(config.prometheus.scrape_interval_secs);
        let coordinator = PollCoordinator::new(target, client, interval);
        let name = coordinator.target().name.clone();

        match registry.register(coordinator).await {
            Ok(true) => {
                let snapshot = registry.get(&name).map(|entry| entry.snapshot());
                info!(
                    target = %name,
                    series = snapshot.map(|s| s.data.len()).unwrap_or(0),
                    "Target registered"
                );
            }
            Ok(false) => {
                warn!(
                    target = %name,
                    "Initial poll failed; target registered and will retry on its interval"
                );
            }
            Err(e) => {
                error!(target = %name, error = %e, "Skipping target");
            }
        }
    }

    if registry.is_empty() {
        anyhow::bail!("No targets could be registered");
    }

    // Watch each target and log cycle outcomes. This is where a host
    // platform's publishing layer would subscribe.
    let mut watchers = Vec::new();
    for (name, entry) in registry.iter() {
        let name = name.clone();
        let mut updates = entry.updates.clone();

        watchers.push(tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.last_update_success {
                    debug!(
                        target = %name,
                        series = snapshot.data.len(),
                        cycle = snapshot.cycles,
                        "Poll cycle complete"
                    );
                } else {
                    warn!(
                        target = %name,
                        cycle = snapshot.cycles,
                        error = snapshot.last_error.as_deref().unwrap_or("unknown"),
                        "Poll cycle failed"
                    );
                }
            }
        }));
    }

    info!(
        targets = registry.len(),
        "Prometheus provider running. Press Ctrl+C to stop."
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    for watcher in watchers {
        watcher.abort();
    }

    let names: Vec<String> = registry.iter().map(|(name, _)| name.clone()).collect();
    for name in names {
        registry.deregister(&name);
    }

    info!("Prometheus provider stopped");

    Ok(())
}
