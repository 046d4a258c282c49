//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Passive health checks (passive.rs):
//!     Consumer poll gauge registered
//!     → Delay check registered in state.rs
//!
//! Active reporting (active.rs):
//!     Periodic timer
//!     → Run every check in state.rs
//!     → Log failures and a summary
//! ```
//!
//! # Design Decisions
//! - Checks observe metrics, they never talk to Kafka
//! - Health state is per-consumer, not per-connector

pub mod active;
pub mod passive;
pub mod state;

pub use active::HealthReporter;
pub use passive::ConsumerHealthListener;
pub use state::{HealthCheck, HealthCheckRegistry, HealthStatus};
