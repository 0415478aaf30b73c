//! Multi-region health and failover.
//!
//! # Data Flow
//! ```text
//! Scheduled cycle:
//!     monitor.check_all(regions)        → probe each /health endpoint
//!         → store.put_health(record)    → latest record per region, overwritten
//!     manager.maybe_failover()
//!         → read records, count consecutive unhealthy for current region
//!         → threshold + cooldown reached: flip active region,
//!           persist marker, best-effort bounded replication
//! ```
//!
//! # Design Decisions
//! - The persisted records are the only cross-process coordination channel,
//!   so fleet-wide failover is eventually consistent
//! - The switch is the priority; data catch-up is best-effort
//! - "No healthy region" falls back to the primary and raises a critical
//!   signal rather than erroring

pub mod failover;
pub mod monitor;
pub mod replication;
pub mod store;

pub use failover::FailoverManager;
pub use monitor::HealthMonitor;
pub use replication::{NoopReplicator, RemoteKvReplicator, ReplicationDriver};
pub use store::{MemoryStateStore, RemoteStateStore, StateStore};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("invalid region endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("region state transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("region state endpoint returned HTTP {0}")]
    UnexpectedStatus(u16),
}

/// Health verdict recorded for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Latest health record for one region. Persisted keyed by region name;
/// stale records are overwritten, never appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionHealth {
    pub region_name: String,
    pub status: HealthStatus,
    /// Unix timestamp of the probe.
    pub last_check: u64,
    /// Probe round-trip in seconds, present on healthy verdicts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_secs: Option<f64>,
    /// Failure description, present on unhealthy verdicts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Optional payload returned by the region's health endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub updated_at: u64,
}

/// Persisted singleton naming the region callers should use right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRegion {
    pub current_region: String,
    /// Unix timestamp of the last failover, 0 if none has happened.
    pub failover_time: u64,
    pub updated_at: u64,
}
