//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Initialize stores/monitor/manager → Run cycle
//!
//! Shutdown:
//!     SIGINT → broadcast shutdown → cycle loop exits cleanly
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
