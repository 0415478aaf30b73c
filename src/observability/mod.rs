//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, remote)
//!     → Metrics endpoint (Prometheus scrape, daemon only)
//! ```
//!
//! # Design Decisions
//! - Metric emission happens at the resilience-core call sites; the business
//!   logic of the tools never touches this module
//! - Metrics are cheap (atomic increments via the `metrics` facade)

pub mod logging;
pub mod metrics;
