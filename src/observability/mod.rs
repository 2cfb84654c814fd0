//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty for development, JSON for aggregation)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted strings
//! - Request ID flows through the HTTP trace span
//! - Metrics are cheap (atomic increments) and no-ops until a recorder is installed
//! - Operator alerts are log events carrying `alert = true` plus a counter

pub mod logging;
pub mod metrics;
