//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (primary region exists in the region list)
//! - Validate value ranges (thresholds ≥ 1, ttl > 0, endpoints parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ResilienceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use url::Url;

use crate::config::schema::ResilienceConfig;

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateRegion(String),
    PrimaryRegionMissing(String),
    InvalidEndpoint { region: String, endpoint: String },
    InvalidCacheEndpoint(String),
    ZeroThreshold(&'static str),
    ZeroTtl,
    ZeroMemoryCapacity,
    EmptyKeyPrefix,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::DuplicateRegion(name) => {
                write!(f, "region '{}' is configured more than once", name)
            }
            ValidationError::PrimaryRegionMissing(name) => {
                write!(f, "primary region '{}' is not in the region list", name)
            }
            ValidationError::InvalidEndpoint { region, endpoint } => {
                write!(f, "region '{}' has invalid endpoint '{}'", region, endpoint)
            }
            ValidationError::InvalidCacheEndpoint(endpoint) => {
                write!(f, "invalid cache tier endpoint '{}'", endpoint)
            }
            ValidationError::ZeroThreshold(which) => {
                write!(f, "{} must be at least 1", which)
            }
            ValidationError::ZeroTtl => write!(f, "cache ttl_secs must be greater than 0"),
            ValidationError::ZeroMemoryCapacity => {
                write!(f, "cache max_memory_items must be greater than 0")
            }
            ValidationError::EmptyKeyPrefix => write!(f, "cache key_prefix must not be empty"),
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for region in &config.regions.regions {
        if !seen.insert(region.name.as_str()) {
            errors.push(ValidationError::DuplicateRegion(region.name.clone()));
        }
        if Url::parse(&region.endpoint).is_err() {
            errors.push(ValidationError::InvalidEndpoint {
                region: region.name.clone(),
                endpoint: region.endpoint.clone(),
            });
        }
    }

    if !config.regions.regions.is_empty()
        && !seen.contains(config.regions.primary_region.as_str())
    {
        errors.push(ValidationError::PrimaryRegionMissing(
            config.regions.primary_region.clone(),
        ));
    }

    if config.regions.failover_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold("failover_threshold"));
    }
    if config.breakers.failure_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold("breakers.failure_threshold"));
    }
    if config.breakers.success_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold("breakers.success_threshold"));
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::ZeroTtl);
    }
    if config.cache.max_memory_items == 0 {
        errors.push(ValidationError::ZeroMemoryCapacity);
    }
    if config.cache.key_prefix.is_empty() {
        errors.push(ValidationError::EmptyKeyPrefix);
    }
    for endpoint in [
        config.cache.fast_tier_endpoint.as_deref(),
        config.cache.durable_tier_endpoint.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        if Url::parse(endpoint).is_err() {
            errors.push(ValidationError::InvalidCacheEndpoint(endpoint.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
