//! Bounded cross-region state replication.
//!
//! Only *what* gets copied and *when* is decided here: entries changed within
//! a recent window, triggered on failover. The copy mechanics stay behind
//! [`ReplicationDriver`] so each deployment can plug in its region's own
//! storage clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::RegionConfig;
use crate::unix_now;

use super::RegionError;

#[async_trait]
pub trait ReplicationDriver: Send + Sync {
    /// Copy state changed within `window` from `source` to `target`, returning
    /// the number of entries copied.
    async fn replicate(
        &self,
        source: &RegionConfig,
        target: &RegionConfig,
        window: Duration,
    ) -> Result<u64, RegionError>;
}

/// Driver for deployments whose storage replicates on its own.
#[derive(Debug, Default)]
pub struct NoopReplicator;

#[async_trait]
impl ReplicationDriver for NoopReplicator {
    async fn replicate(
        &self,
        source: &RegionConfig,
        target: &RegionConfig,
        _window: Duration,
    ) -> Result<u64, RegionError> {
        tracing::debug!(
            source = %source.name,
            target = %target.name,
            "Replication driver is a no-op"
        );
        Ok(0)
    }
}

/// One changed entry reported by a region's KV endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedEntry {
    pub key: String,
    pub value: Value,
    pub updated_at: u64,
}

/// Scan-and-copy driver over the regional KV endpoints:
/// `GET {source}/kv?changed_since={unix}` then `PUT {target}/kv/{key}` each.
#[derive(Debug, Clone)]
pub struct RemoteKvReplicator {
    client: reqwest::Client,
}

impl RemoteKvReplicator {
    pub fn new(timeout: Duration) -> Result<Self, RegionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RegionError::Http)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReplicationDriver for RemoteKvReplicator {
    async fn replicate(
        &self,
        source: &RegionConfig,
        target: &RegionConfig,
        window: Duration,
    ) -> Result<u64, RegionError> {
        let cutoff = unix_now().saturating_sub(window.as_secs());
        let list_url = format!(
            "{}/kv?changed_since={}",
            source.endpoint.trim_end_matches('/'),
            cutoff
        );

        let response = self.client.get(&list_url).send().await?;
        if !response.status().is_success() {
            return Err(RegionError::UnexpectedStatus(response.status().as_u16()));
        }
        let entries: Vec<ChangedEntry> = response.json().await?;

        let mut copied = 0u64;
        for entry in &entries {
            let put_url = format!(
                "{}/kv/{}",
                target.endpoint.trim_end_matches('/'),
                entry.key
            );
            let response = self.client.put(&put_url).json(&entry.value).send().await?;
            if !response.status().is_success() {
                return Err(RegionError::UnexpectedStatus(response.status().as_u16()));
            }
            copied += 1;
        }

        tracing::info!(
            source = %source.name,
            target = %target.name,
            copied,
            window_secs = window.as_secs(),
            "Replicated recent entries"
        );
        Ok(copied)
    }
}
