//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! resilience layer. All types derive Serde traits for deserialization from
//! config files and are read-only after construction.

use serde::{Deserialize, Serialize};

/// Root configuration for the resilience layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Tiered cache settings.
    pub cache: CacheSettings,

    /// Multi-region health and failover settings.
    pub regions: MultiRegionSettings,

    /// Default circuit breaker settings.
    pub breakers: BreakerSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Tiered cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Low-latency remote KV endpoint. Probed first when set.
    pub fast_tier_endpoint: Option<String>,

    /// Durable remote KV endpoint. Probed after the fast tier.
    pub durable_tier_endpoint: Option<String>,

    /// Default time-to-live for cached values in seconds.
    pub ttl_secs: u64,

    /// Capacity of the in-process tier.
    pub max_memory_items: usize,

    /// Prefix applied to every derived key.
    pub key_prefix: String,

    /// Request timeout for remote tiers in seconds.
    pub remote_timeout_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            fast_tier_endpoint: None,
            durable_tier_endpoint: None,
            ttl_secs: 3600,
            max_memory_items: 1000,
            key_prefix: "prbot".to_string(),
            remote_timeout_secs: 5,
        }
    }
}

/// Operator-assigned status of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionStatus {
    Active,
    Standby,
    Failed,
    Maintenance,
}

/// Static configuration for one region.
///
/// Health verdicts are not kept here: the monitor writes them to the
/// persisted per-region health records, so configuration stays immutable at
/// runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegionConfig {
    /// Unique region identifier (e.g., "us-east-1").
    pub name: String,

    /// Operator-assigned status; only active/standby regions are failover
    /// candidates.
    pub status: RegionStatus,

    /// Preference order, lower = preferred.
    pub priority: u32,

    /// Base URL of the region's API; `/health` is probed under it.
    pub endpoint: String,

    /// Durable-store identifier in this region.
    #[serde(default)]
    pub store_table: Option<String>,

    /// Object-store identifier in this region.
    #[serde(default)]
    pub artifact_bucket: Option<String>,
}

/// Multi-region health and failover settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MultiRegionSettings {
    /// Region preferred whenever it is healthy.
    pub primary_region: String,

    /// All configured regions, primary included.
    pub regions: Vec<RegionConfig>,

    /// Master switch for automatic failover.
    pub failover_enabled: bool,

    /// Seconds between scheduled health cycles.
    pub health_check_interval_secs: u64,

    /// Timeout for one health probe in seconds.
    pub health_check_timeout_secs: u64,

    /// Consecutive unhealthy observations before a failover.
    pub failover_threshold: u32,

    /// Minimum seconds between failovers.
    pub failover_cooldown_secs: u64,

    /// How far back post-failover replication reaches, in seconds.
    pub replication_window_secs: u64,

    /// Endpoint of the store holding health records and the active-region
    /// marker. Falls back to an in-process store when unset.
    pub state_endpoint: Option<String>,

    /// Request timeout against the state store in seconds.
    pub state_timeout_secs: u64,
}

impl Default for MultiRegionSettings {
    fn default() -> Self {
        Self {
            primary_region: "us-east-1".to_string(),
            regions: Vec::new(),
            failover_enabled: true,
            health_check_interval_secs: 300,
            health_check_timeout_secs: 10,
            failover_threshold: 3,
            failover_cooldown_secs: 300,
            replication_window_secs: 86_400,
            state_endpoint: None,
            state_timeout_secs: 5,
        }
    }
}

/// Default circuit breaker settings, applied to breakers created without an
/// explicit config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Consecutive classified failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before admitting a probe.
    pub recovery_timeout_secs: u64,

    /// Consecutive probe successes before the circuit closes.
    pub success_threshold: u32,

    /// Deadline for each wrapped call in seconds.
    pub call_timeout_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
            success_threshold: 3,
            call_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
