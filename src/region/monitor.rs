//! Region health probing.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RegionConfig;
use crate::unix_now;
use crate::observability::metrics;

use super::{HealthStatus, RegionError, RegionHealth, StateStore};

/// Probes each configured region's liveness endpoint and persists the verdict.
pub struct HealthMonitor {
    client: reqwest::Client,
    store: Arc<dyn StateStore>,
}

impl HealthMonitor {
    pub fn new(store: Arc<dyn StateStore>, timeout: Duration) -> Result<Self, RegionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RegionError::Http)?;
        Ok(Self { client, store })
    }

    /// Probe one region and persist the result, healthy or not.
    ///
    /// A 200 yields `healthy` with the round-trip time and any JSON detail
    /// payload the endpoint returned; a non-200 or transport error yields
    /// `unhealthy` with the error recorded.
    pub async fn check(&self, region: &RegionConfig) -> RegionHealth {
        let url = format!("{}/health", region.endpoint.trim_end_matches('/'));
        let started = Instant::now();

        let record = match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let elapsed = started.elapsed().as_secs_f64();
                let details = response.json::<serde_json::Value>().await.ok();
                RegionHealth {
                    region_name: region.name.clone(),
                    status: HealthStatus::Healthy,
                    last_check: unix_now(),
                    response_time_secs: Some(elapsed),
                    error: None,
                    details,
                    updated_at: unix_now(),
                }
            }
            Ok(response) => self.unhealthy(region, format!("HTTP {}", response.status().as_u16())),
            Err(e) => self.unhealthy(region, e.to_string()),
        };

        if record.status != HealthStatus::Healthy {
            tracing::warn!(
                region = %region.name,
                error = record.error.as_deref().unwrap_or(""),
                "Region health check failed"
            );
        }
        metrics::record_region_health(&region.name, record.status == HealthStatus::Healthy);

        if let Err(e) = self.store.put_health(&record).await {
            tracing::error!(region = %region.name, error = %e, "Failed to persist health record");
        }

        record
    }

    /// Probe all regions concurrently. One region's failure never blocks or
    /// delays another's; every probe still honors the configured timeout.
    pub async fn check_all(&self, regions: &[RegionConfig]) -> Vec<RegionHealth> {
        let records = join_all(regions.iter().map(|region| self.check(region))).await;

        let healthy = records
            .iter()
            .filter(|r| r.status == HealthStatus::Healthy)
            .count();
        metrics::record_healthy_regions(healthy);
        tracing::info!(
            healthy,
            total = records.len(),
            "Region health cycle complete"
        );

        records
    }

    fn unhealthy(&self, region: &RegionConfig, error: String) -> RegionHealth {
        RegionHealth {
            region_name: region.name.clone(),
            status: HealthStatus::Unhealthy,
            last_check: unix_now(),
            response_time_secs: None,
            error: Some(error),
            details: None,
            updated_at: unix_now(),
        }
    }
}
