//! Remote key/value cache tier.
//!
//! Speaks a small REST protocol against a regional KV endpoint:
//! `GET/PUT/DELETE {base}/kv/{key}` with [`CacheItem`] JSON bodies. The remote
//! side owns passive expiry keyed off `expires_at`; this client still refuses
//! to return an expired item it happens to read. Two instances of this store
//! cover both remote tiers (low-latency and durable), differing only in
//! endpoint and timeout.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

use super::{CacheError, CacheItem, CacheStore};

#[derive(Debug, Clone)]
pub struct RemoteKvStore {
    name: String,
    base: Url,
    client: reqwest::Client,
}

impl RemoteKvStore {
    /// Build a client for one remote tier. Fails on an invalid endpoint; the
    /// tiered cache treats that as "this tier is unavailable for the process
    /// lifetime".
    pub fn connect(
        name: impl Into<String>,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, CacheError> {
        let base = Url::parse(endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CacheError::Http)?;
        Ok(Self {
            name: name.into(),
            base,
            client,
        })
    }

    fn key_url(&self, key: &str) -> String {
        format!("{}/kv/{}", self.base.as_str().trim_end_matches('/'), key)
    }
}

#[async_trait]
impl CacheStore for RemoteKvStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<CacheItem>, CacheError> {
        let response = self.client.get(self.key_url(key)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let item: CacheItem = response.json().await?;
                Ok(Some(item))
            }
            status => Err(CacheError::UnexpectedStatus(status.as_u16())),
        }
    }

    async fn set(&self, key: &str, item: CacheItem) -> Result<(), CacheError> {
        let response = self
            .client
            .put(self.key_url(key))
            .json(&item)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CacheError::UnexpectedStatus(response.status().as_u16()))
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let response = self.client.delete(self.key_url(key)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(CacheError::UnexpectedStatus(status.as_u16())),
        }
    }
}
