//! Tiered fallback cache.
//!
//! # Data Flow
//! ```text
//! get(namespace, parts):
//!     derive key → probe tiers in preference order
//!     (fast remote KV → durable remote KV → in-process memory)
//!     first unexpired hit wins; a tier error is a miss for that tier only
//!
//! set(namespace, value, ttl, parts):
//!     derive key → write every tier independently
//!     ok if at least one tier accepted the write
//! ```
//!
//! # Design Decisions
//! - No write-back on read: a hit in a far tier does not populate closer ones
//! - Tiers that fail to initialize are skipped for the process lifetime
//! - Values are opaque JSON; schemas belong to the callers

pub mod key;
pub mod memory;
pub mod remote;

pub use key::{derive_key, KeyParts};
pub use memory::MemoryStore;
pub use remote::RemoteKvStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::config::CacheSettings;
use crate::observability::metrics;

/// Error raised by a single cache tier. Degraded tiers never fail the overall
/// operation; the tiered cache logs these and moves on.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("cache transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cache endpoint returned HTTP {0}")]
    UnexpectedStatus(u16),
}

/// One stored value with its expiry bookkeeping.
///
/// Invariant: `expires_at >= created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheItem {
    pub key: String,
    pub value: Value,
    /// Unix timestamp, fractional seconds.
    pub created_at: f64,
    /// Unix timestamp, fractional seconds.
    pub expires_at: f64,
    #[serde(default)]
    pub hits: u64,
}

impl CacheItem {
    pub fn new(key: String, value: Value, ttl: Duration) -> Self {
        let now = now_secs();
        Self {
            key,
            value,
            created_at: now,
            expires_at: now + ttl.as_secs_f64(),
            hits: 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        now_secs() > self.expires_at
    }
}

/// Contract implemented by each tier.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &str;
    async fn get(&self, key: &str) -> Result<Option<CacheItem>, CacheError>;
    async fn set(&self, key: &str, item: CacheItem) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Occupancy and hit-rate report for the cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub tiers: Vec<String>,
    pub memory_items: usize,
    pub memory_max_items: usize,
    pub memory_hit_counts: HashMap<String, u64>,
}

/// Ordered chain of cache tiers behind one get/set/delete surface.
pub struct TieredCache {
    prefix: String,
    default_ttl: Duration,
    stores: Vec<Arc<dyn CacheStore>>,
    memory: Arc<MemoryStore>,
}

impl TieredCache {
    /// Build the tier chain from settings. Remote tiers with no configured
    /// endpoint, or whose client fails to build, are skipped permanently; the
    /// in-process tier is always present as the last resort.
    pub fn new(settings: &CacheSettings) -> Self {
        let mut stores: Vec<Arc<dyn CacheStore>> = Vec::new();
        let timeout = Duration::from_secs(settings.remote_timeout_secs);

        for (name, endpoint) in [
            ("fast-kv", settings.fast_tier_endpoint.as_deref()),
            ("durable-kv", settings.durable_tier_endpoint.as_deref()),
        ] {
            let Some(endpoint) = endpoint else { continue };
            match RemoteKvStore::connect(name, endpoint, timeout) {
                Ok(store) => {
                    tracing::info!(tier = name, endpoint, "Cache tier initialized");
                    stores.push(Arc::new(store));
                }
                Err(e) => {
                    tracing::warn!(tier = name, endpoint, error = %e, "Skipping cache tier");
                }
            }
        }

        let memory = Arc::new(MemoryStore::new(settings.max_memory_items));
        stores.push(memory.clone());

        Self {
            prefix: settings.key_prefix.clone(),
            default_ttl: Duration::from_secs(settings.ttl_secs),
            stores,
            memory,
        }
    }

    /// Probe tiers in order; first unexpired hit wins, no write-back.
    pub async fn get(&self, namespace: &str, parts: &KeyParts) -> Option<Value> {
        let key = derive_key(&self.prefix, namespace, parts);

        for store in &self.stores {
            match store.get(&key).await {
                Ok(Some(item)) if !item.is_expired() => {
                    tracing::debug!(key = %key, tier = store.name(), "Cache hit");
                    metrics::record_cache_hit(store.name());
                    return Some(item.value);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(key = %key, tier = store.name(), error = %e, "Cache tier get error");
                }
            }
        }

        tracing::debug!(key = %key, "Cache miss");
        metrics::record_cache_miss();
        None
    }

    /// Write to every tier independently. Returns true if at least one tier
    /// accepted the write.
    pub async fn set(
        &self,
        namespace: &str,
        value: Value,
        ttl: Option<Duration>,
        parts: &KeyParts,
    ) -> bool {
        let key = derive_key(&self.prefix, namespace, parts);
        let item = CacheItem::new(key.clone(), value, ttl.unwrap_or(self.default_ttl));

        let mut accepted = false;
        for store in &self.stores {
            match store.set(&key, item.clone()).await {
                Ok(()) => accepted = true,
                Err(e) => {
                    tracing::warn!(key = %key, tier = store.name(), error = %e, "Cache tier set error");
                }
            }
        }
        accepted
    }

    /// Delete from every tier. Returns true if at least one tier succeeded.
    pub async fn delete(&self, namespace: &str, parts: &KeyParts) -> bool {
        let key = derive_key(&self.prefix, namespace, parts);

        let mut deleted = false;
        for store in &self.stores {
            match store.delete(&key).await {
                Ok(()) => deleted = true,
                Err(e) => {
                    tracing::warn!(key = %key, tier = store.name(), error = %e, "Cache tier delete error");
                }
            }
        }
        deleted
    }

    /// Bulk maintenance: drop in-process entries, optionally limited to one
    /// namespace. Remote tiers are untouched.
    pub fn clear(&self, namespace: Option<&str>) {
        match namespace {
            Some(ns) => self.memory.clear(Some(&format!("{}:{}:", self.prefix, ns))),
            None => self.memory.clear(None),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            tiers: self.stores.iter().map(|s| s.name().to_string()).collect(),
            memory_items: self.memory.len(),
            memory_max_items: self.memory.max_items(),
            memory_hit_counts: self.memory.hit_counts(),
        }
    }
}

pub(crate) fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_only_settings() -> CacheSettings {
        CacheSettings {
            fast_tier_endpoint: None,
            durable_tier_endpoint: None,
            ..CacheSettings::default()
        }
    }

    #[tokio::test]
    async fn round_trip_and_ttl_expiry() {
        let cache = TieredCache::new(&memory_only_settings());
        let parts = KeyParts::new().arg("pr-42");

        assert!(
            cache
                .set(
                    "cost",
                    json!(42),
                    Some(Duration::from_millis(60)),
                    &parts
                )
                .await
        );
        assert_eq!(cache.get("cost", &parts).await, Some(json!(42)));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.get("cost", &parts).await, None);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = TieredCache::new(&memory_only_settings());
        let parts = KeyParts::new().kw("repo", "infra");

        cache.set("scan", json!({"high": 1}), None, &parts).await;
        assert!(cache.delete("scan", &parts).await);
        assert_eq!(cache.get("scan", &parts).await, None);
    }

    #[tokio::test]
    async fn clear_is_namespace_scoped() {
        let cache = TieredCache::new(&memory_only_settings());
        let parts = KeyParts::new();

        cache.set("a", json!(1), None, &parts).await;
        cache.set("b", json!(2), None, &parts).await;
        cache.clear(Some("a"));

        assert_eq!(cache.get("a", &parts).await, None);
        assert_eq!(cache.get("b", &parts).await, Some(json!(2)));
    }

    #[tokio::test]
    async fn unreachable_remote_tier_is_skipped_not_fatal() {
        // Endpoint fails to parse, so only the memory tier survives.
        let settings = CacheSettings {
            fast_tier_endpoint: Some("not a url".to_string()),
            ..memory_only_settings()
        };
        let cache = TieredCache::new(&settings);
        assert_eq!(cache.stats().tiers, vec!["memory".to_string()]);

        let parts = KeyParts::new();
        assert!(cache.set("ns", json!("v"), None, &parts).await);
        assert_eq!(cache.get("ns", &parts).await, Some(json!("v")));
    }

    #[tokio::test]
    async fn stats_reflect_memory_occupancy() {
        let cache = TieredCache::new(&memory_only_settings());
        cache.set("ns", json!(1), None, &KeyParts::new().arg(1)).await;
        cache.set("ns", json!(2), None, &KeyParts::new().arg(2)).await;

        let stats = cache.stats();
        assert_eq!(stats.memory_items, 2);
        assert_eq!(stats.tiers, vec!["memory".to_string()]);
    }
}
