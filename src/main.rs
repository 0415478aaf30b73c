//! Region sentinel daemon.
//!
//! Scheduled driver for the multi-region half of the resilience layer: every
//! interval it probes each configured region's health endpoint, persists the
//! verdicts, lets the failover manager apply its hysteresis, and emits the
//! health/active-region gauges consumed by external monitoring.
//!
//! ```text
//!     interval tick
//!         → HealthMonitor::check_all (probe + persist per region)
//!         → FailoverManager::maybe_failover (hysteresis, cooldown, switch)
//!         → metrics: healthy_regions, active_region_is_primary
//! ```
//!
//! The breaker and cache halves of the crate have no scheduled component;
//! they live inside the tool processes that construct them.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use resilience_core::config::{loader, MultiRegionSettings, ResilienceConfig};
use resilience_core::lifecycle::Shutdown;
use resilience_core::observability::{logging, metrics};
use resilience_core::region::{
    FailoverManager, HealthMonitor, MemoryStateStore, RemoteKvReplicator, RemoteStateStore,
    StateStore,
};

#[derive(Parser)]
#[command(name = "region-sentinel")]
#[command(about = "Multi-region health checker and failover manager", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => loader::load_config(path)?,
        None => ResilienceConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("region-sentinel v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let settings = config.regions.clone();
    tracing::info!(
        primary = %settings.primary_region,
        regions = settings.regions.len(),
        interval_secs = settings.health_check_interval_secs,
        failover_enabled = settings.failover_enabled,
        "Configuration loaded"
    );

    let store = build_state_store(&settings)?;
    let monitor = HealthMonitor::new(
        store.clone(),
        Duration::from_secs(settings.health_check_timeout_secs),
    )?;
    let replicator = Arc::new(RemoteKvReplicator::new(Duration::from_secs(
        settings.state_timeout_secs,
    ))?);
    let manager = FailoverManager::load(settings.clone(), store, replicator).await?;

    let shutdown = Shutdown::new();
    let mut shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            shutdown.trigger();
        }
    });

    let mut ticker = time::interval(Duration::from_secs(settings.health_check_interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_cycle(&monitor, &manager, &settings).await;
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_state_store(
    settings: &MultiRegionSettings,
) -> Result<Arc<dyn StateStore>, Box<dyn std::error::Error>> {
    match &settings.state_endpoint {
        Some(endpoint) => {
            let store = RemoteStateStore::connect(
                endpoint,
                Duration::from_secs(settings.state_timeout_secs),
            )?;
            tracing::info!(endpoint, "Using remote state store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No state endpoint configured; using in-process state store");
            Ok(Arc::new(MemoryStateStore::new()))
        }
    }
}

async fn run_cycle(
    monitor: &HealthMonitor,
    manager: &FailoverManager,
    settings: &MultiRegionSettings,
) {
    monitor.check_all(&settings.regions).await;

    match manager.maybe_failover().await {
        Ok(Some(region)) => tracing::warn!(region = %region, "Failover performed"),
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "Failover evaluation failed"),
    }

    let active = manager.active_region();
    metrics::record_active_region(&active, *active == settings.primary_region);
    tracing::info!(active = %active, "Health cycle complete");
}
