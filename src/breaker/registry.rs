//! Breaker registry: one instance per guarded dependency.
//!
//! Warm process instances reuse breaker state across invocations; this is an
//! explicit cache-of-instances owned by the composition root, not ambient
//! global state. Breakers are created lazily on first access and live for the
//! process lifetime.

use dashmap::DashMap;
use std::sync::Arc;

use super::{BreakerConfig, BreakerSnapshot, CircuitBreaker};

#[derive(Debug)]
pub struct BreakerRegistry {
    default_config: BreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(default_config: BreakerConfig) -> Self {
        Self {
            default_config,
            breakers: DashMap::new(),
        }
    }

    /// Get the breaker for `name`, creating it with the registry default
    /// config on first access.
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        self.get_with(name, || self.default_config.clone())
    }

    /// Get the breaker for `name`, creating it with `config()` on first
    /// access. The config only applies to creation; an existing breaker keeps
    /// the config it was born with.
    pub fn get_with(
        &self,
        name: &str,
        config: impl FnOnce() -> BreakerConfig,
    ) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, config())))
            .clone()
    }

    /// Snapshots of every registered breaker, for the observability surface.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        self.breakers
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect()
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}
