//! Metrics collection and exposition.
//!
//! # Metrics
//! - `breaker_transitions_total` (counter): state changes by breaker, target state
//! - `breaker_rejections_total` (counter): calls rejected while open
//! - `cache_hits_total` / `cache_misses_total` (counters): by tier
//! - `region_health` (gauge): 1=healthy, 0=unhealthy, per region
//! - `healthy_regions` (gauge): healthy count per cycle
//! - `failovers_total` (counter): region switches
//! - `no_healthy_regions_total` (counter): critical last-resort fallbacks
//!
//! # Design Decisions
//! - Low-overhead updates via the `metrics` facade
//! - Exposition is Prometheus scrape, started only by the daemon

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::breaker::State;

/// Install the Prometheus exporter on `addr`. Call once from the daemon.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_breaker_transition(name: &str, to: State) {
    metrics::counter!(
        "breaker_transitions_total",
        "breaker" => name.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

pub fn record_breaker_rejection(name: &str) {
    metrics::counter!("breaker_rejections_total", "breaker" => name.to_string()).increment(1);
}

pub fn record_cache_hit(tier: &str) {
    metrics::counter!("cache_hits_total", "tier" => tier.to_string()).increment(1);
}

pub fn record_cache_miss() {
    metrics::counter!("cache_misses_total").increment(1);
}

pub fn record_region_health(region: &str, healthy: bool) {
    metrics::gauge!("region_health", "region" => region.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_healthy_regions(count: usize) {
    metrics::gauge!("healthy_regions").set(count as f64);
}

pub fn record_active_region(region: &str, is_primary: bool) {
    metrics::gauge!("active_region_is_primary", "region" => region.to_string())
        .set(if is_primary { 1.0 } else { 0.0 });
}

pub fn record_failover(from: &str, to: &str) {
    metrics::counter!(
        "failovers_total",
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// Critical condition: every region reported unhealthy and the primary was
/// returned as a last resort.
pub fn record_no_healthy_regions() {
    metrics::counter!("no_healthy_regions_total").increment(1);
}
