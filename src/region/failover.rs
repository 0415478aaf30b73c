//! Failover decision logic.
//!
//! Hysteresis guards against flapping: the active region only flips after
//! `failover_threshold` consecutive unhealthy observations of the current
//! region, and only once the cooldown since the previous failover has
//! elapsed. The switch itself is the priority; replication afterwards is
//! best-effort.

use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{MultiRegionSettings, RegionConfig, RegionStatus};
use crate::unix_now;
use crate::observability::metrics;

use super::{ActiveRegion, HealthStatus, RegionError, RegionHealth};
use super::{ReplicationDriver, StateStore};

#[derive(Debug)]
struct FailoverState {
    consecutive_failures: u32,
    last_failover_unix: u64,
}

/// Decides the active region and performs hysteretic failover.
pub struct FailoverManager {
    settings: MultiRegionSettings,
    store: Arc<dyn StateStore>,
    replicator: Arc<dyn ReplicationDriver>,
    current: ArcSwap<String>,
    state: Mutex<FailoverState>,
}

impl FailoverManager {
    /// Build the manager, re-reading the persisted active-region marker so a
    /// cold start picks up where the fleet left off.
    pub async fn load(
        settings: MultiRegionSettings,
        store: Arc<dyn StateStore>,
        replicator: Arc<dyn ReplicationDriver>,
    ) -> Result<Arc<Self>, RegionError> {
        let marker = store.active().await?;
        let (current, last_failover_unix) = match marker {
            Some(m) => {
                tracing::info!(
                    region = %m.current_region,
                    failover_time = m.failover_time,
                    "Restored active region from persisted marker"
                );
                (m.current_region, m.failover_time)
            }
            None => (settings.primary_region.clone(), 0),
        };

        Ok(Arc::new(Self {
            settings,
            store,
            replicator,
            current: ArcSwap::from_pointee(current),
            state: Mutex::new(FailoverState {
                consecutive_failures: 0,
                last_failover_unix,
            }),
        }))
    }

    /// The region callers should use right now. Lock-free read.
    pub fn active_region(&self) -> Arc<String> {
        self.current.load_full()
    }

    /// Pick the region that should be active given the latest health records:
    /// the configured primary if healthy, otherwise the lowest-priority-number
    /// healthy region. With no healthy region at all this falls back to the
    /// primary as a deliberate last resort and raises a critical signal; the
    /// return value alone is not a health guarantee.
    pub fn decide_active_region(&self, records: &[RegionHealth]) -> String {
        let is_healthy = |name: &str| {
            records
                .iter()
                .any(|r| r.region_name == name && r.status == HealthStatus::Healthy)
        };

        let eligible = |region: &&RegionConfig| {
            matches!(region.status, RegionStatus::Active | RegionStatus::Standby)
        };

        let primary_eligible = self
            .settings
            .regions
            .iter()
            .filter(eligible)
            .any(|r| r.name == self.settings.primary_region);
        if primary_eligible && is_healthy(&self.settings.primary_region) {
            return self.settings.primary_region.clone();
        }

        if let Some(best) = self
            .settings
            .regions
            .iter()
            .filter(eligible)
            .filter(|r| is_healthy(&r.name))
            .min_by_key(|r| r.priority)
        {
            return best.name.clone();
        }

        tracing::error!(
            primary = %self.settings.primary_region,
            "No healthy regions; falling back to primary"
        );
        metrics::record_no_healthy_regions();
        self.settings.primary_region.clone()
    }

    /// One failover observation, normally invoked once per health cycle.
    ///
    /// Returns the new active region if a switch happened. Idempotent while
    /// the current region is healthy: such calls just reset the failure
    /// counter.
    pub async fn maybe_failover(&self) -> Result<Option<String>, RegionError> {
        let records = self.store.all_health().await?;
        let current = self.active_region();

        let observed = records
            .iter()
            .find(|r| r.region_name == *current)
            .map(|r| r.status);

        let failures = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match observed {
                Some(HealthStatus::Healthy) => {
                    state.consecutive_failures = 0;
                    return Ok(None);
                }
                Some(HealthStatus::Unhealthy) => {
                    state.consecutive_failures += 1;
                    state.consecutive_failures
                }
                // No record yet, or explicitly unknown: no evidence either way.
                _ => return Ok(None),
            }
        };

        if !self.settings.failover_enabled {
            return Ok(None);
        }

        if failures < self.settings.failover_threshold {
            tracing::debug!(
                region = %current,
                failures,
                threshold = self.settings.failover_threshold,
                "Current region unhealthy, below failover threshold"
            );
            return Ok(None);
        }

        let now = unix_now();
        let last_failover = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.last_failover_unix
        };
        if now.saturating_sub(last_failover) < self.settings.failover_cooldown_secs {
            tracing::warn!(
                region = %current,
                failures,
                "Failover suppressed by cooldown"
            );
            return Ok(None);
        }

        let target = self.decide_active_region(&records);
        if target == *current {
            tracing::error!(
                region = %current,
                "Current region unhealthy but no better region available"
            );
            return Ok(None);
        }

        self.switch_to(&current, target, now).await
    }

    async fn switch_to(
        &self,
        old: &str,
        target: String,
        now: u64,
    ) -> Result<Option<String>, RegionError> {
        let marker = ActiveRegion {
            current_region: target.clone(),
            failover_time: now,
            updated_at: now,
        };
        self.store.put_active(&marker).await?;

        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.consecutive_failures = 0;
            state.last_failover_unix = now;
        }
        self.current.store(Arc::new(target.clone()));

        tracing::warn!(from = %old, to = %target, "Region failover");
        metrics::record_failover(old, &target);

        // Data catch-up is best-effort; the switch above already happened.
        self.replicate_after_switch(old, &target).await;

        Ok(Some(target))
    }

    async fn replicate_after_switch(&self, old: &str, new: &str) {
        let source = self.settings.regions.iter().find(|r| r.name == old);
        let target = self.settings.regions.iter().find(|r| r.name == new);
        let (Some(source), Some(target)) = (source, target) else {
            return;
        };

        let window = Duration::from_secs(self.settings.replication_window_secs);
        match self.replicator.replicate(source, target, window).await {
            Ok(copied) => {
                tracing::info!(from = %old, to = %new, copied, "Post-failover replication done");
            }
            Err(e) => {
                tracing::error!(from = %old, to = %new, error = %e, "Post-failover replication failed");
            }
        }
    }
}
