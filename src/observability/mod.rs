//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Coordinator and triggers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Service name travels as a span field, never as global state
//! - Metrics are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
