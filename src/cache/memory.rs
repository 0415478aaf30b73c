//! Bounded in-process cache tier.
//!
//! Last tier in the chain: survives warm invocations of the same process and
//! nothing else. Capacity is enforced by evicting the entry with the oldest
//! last-access timestamp (LRU by access, not insertion). Expiry is lazy; an
//! expired entry is only dropped when it is next read or overwritten.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use super::{CacheError, CacheItem, CacheStore};

#[derive(Debug)]
struct Entry {
    item: CacheItem,
    last_access: Instant,
}

#[derive(Debug)]
pub struct MemoryStore {
    max_items: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Hit counts per resident key.
    pub fn hit_counts(&self) -> HashMap<String, u64> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .map(|(k, e)| (k.clone(), e.item.hits))
            .collect()
    }

    /// Drop entries whose key starts with `prefix`, or everything when
    /// `prefix` is `None`. Bulk maintenance only.
    pub fn clear(&self, prefix: Option<&str>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match prefix {
            Some(p) => entries.retain(|key, _| !key.starts_with(p)),
            None => entries.clear(),
        }
    }

    fn get_sync(&self, key: &str) -> Option<CacheItem> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get_mut(key) {
            Some(entry) if !entry.item.is_expired() => {
                entry.item.hits += 1;
                entry.last_access = Instant::now();
                Some(entry.item.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set_sync(&self, key: &str, item: CacheItem) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= self.max_items && !entries.contains_key(key) {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone())
            {
                tracing::debug!(key = %oldest, "Evicting least-recently-accessed cache entry");
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                item,
                last_access: Instant::now(),
            },
        );
    }

    fn delete_sync(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<CacheItem>, CacheError> {
        Ok(self.get_sync(key))
    }

    async fn set(&self, key: &str, item: CacheItem) -> Result<(), CacheError> {
        self.set_sync(key, item);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.delete_sync(key);
        Ok(())
    }
}
