//! Resilience layer for the pull-request analysis tools.
//!
//! Three narrow contracts, consumed by the webhook/tool plumbing around this
//! crate:
//!
//! - "execute this call through a named breaker": [`breaker::BreakerRegistry`]
//! - "get/set a value under a cache namespace": [`cache::TieredCache`]
//! - "what region should I use right now": [`region::FailoverManager`]
//!
//! Everything here is explicitly constructed and injected; warm-process reuse
//! is a property of the caller holding these objects across invocations, not
//! of hidden global state.

pub mod breaker;
pub mod cache;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod region;

pub use breaker::{BreakerConfig, BreakerRegistry, CircuitBreaker};
pub use cache::{KeyParts, TieredCache};
pub use config::ResilienceConfig;
pub use region::{FailoverManager, HealthMonitor};

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
