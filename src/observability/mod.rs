//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Consumers and listeners produce:
//!     → metrics.rs (counters, gauges, derived gauges)
//!     → logging.rs (structured log events)
//!
//! Reporters (reporters.rs) read registry snapshots:
//!     → LogReporter (periodic log lines)
//!     → PrometheusReporter (scrape endpoint)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Metrics are cheap (atomic increments)
//! - Reporters are lifecycle resources, released in reverse order

pub mod logging;
pub mod metrics;
pub mod reporters;

pub use metrics::{Metric, MetricRegistry, MetricValue, RegistryListener};
pub use reporters::{LogReporter, PrometheusReporter};
