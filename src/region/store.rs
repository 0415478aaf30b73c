//! Persistence for region health records and the active-region marker.
//!
//! These records are the only coordination channel between process instances:
//! a cold start re-reads the marker so failover decisions survive restarts.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use super::{ActiveRegion, RegionError, RegionHealth};

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Overwrite the latest health record for a region.
    async fn put_health(&self, record: &RegionHealth) -> Result<(), RegionError>;

    async fn health(&self, region: &str) -> Result<Option<RegionHealth>, RegionError>;

    async fn all_health(&self) -> Result<Vec<RegionHealth>, RegionError>;

    /// Overwrite the active-region marker.
    async fn put_active(&self, marker: &ActiveRegion) -> Result<(), RegionError>;

    async fn active(&self) -> Result<Option<ActiveRegion>, RegionError>;
}

/// Process-local store for tests and single-instance deployments.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    health: Mutex<HashMap<String, RegionHealth>>,
    active: Mutex<Option<ActiveRegion>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn put_health(&self, record: &RegionHealth) -> Result<(), RegionError> {
        let mut health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        health.insert(record.region_name.clone(), record.clone());
        Ok(())
    }

    async fn health(&self, region: &str) -> Result<Option<RegionHealth>, RegionError> {
        let health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        Ok(health.get(region).cloned())
    }

    async fn all_health(&self) -> Result<Vec<RegionHealth>, RegionError> {
        let health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        Ok(health.values().cloned().collect())
    }

    async fn put_active(&self, marker: &ActiveRegion) -> Result<(), RegionError> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        *active = Some(marker.clone());
        Ok(())
    }

    async fn active(&self) -> Result<Option<ActiveRegion>, RegionError> {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        Ok(active.clone())
    }
}

/// Durable store backed by a remote KV endpoint, same wire style as the
/// remote cache tiers:
///
/// - `GET/PUT {base}/regions/{name}/health`
/// - `GET {base}/regions/health` (all records)
/// - `GET/PUT {base}/regions/active`
#[derive(Debug, Clone)]
pub struct RemoteStateStore {
    base: Url,
    client: reqwest::Client,
}

impl RemoteStateStore {
    pub fn connect(endpoint: &str, timeout: Duration) -> Result<Self, RegionError> {
        let base = Url::parse(endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RegionError::Http)?;
        Ok(Self { base, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), path)
    }
}

#[async_trait]
impl StateStore for RemoteStateStore {
    async fn put_health(&self, record: &RegionHealth) -> Result<(), RegionError> {
        let url = self.url(&format!("regions/{}/health", record.region_name));
        let response = self.client.put(url).json(record).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RegionError::UnexpectedStatus(response.status().as_u16()))
        }
    }

    async fn health(&self, region: &str) -> Result<Option<RegionHealth>, RegionError> {
        let url = self.url(&format!("regions/{}/health", region));
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(RegionError::UnexpectedStatus(status.as_u16())),
        }
    }

    async fn all_health(&self) -> Result<Vec<RegionHealth>, RegionError> {
        let response = self.client.get(self.url("regions/health")).send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(RegionError::UnexpectedStatus(response.status().as_u16()))
        }
    }

    async fn put_active(&self, marker: &ActiveRegion) -> Result<(), RegionError> {
        let response = self
            .client
            .put(self.url("regions/active"))
            .json(marker)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(RegionError::UnexpectedStatus(response.status().as_u16()))
        }
    }

    async fn active(&self) -> Result<Option<ActiveRegion>, RegionError> {
        let response = self.client.get(self.url("regions/active")).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(RegionError::UnexpectedStatus(status.as_u16())),
        }
    }
}
