//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! notify, lifecycle produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (notification, signal and reload counters)
//!
//! Consumers:
//!     → journal / stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
