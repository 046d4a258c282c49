//! Kafka consumer subsystem.
//!
//! # Data Flow
//! ```text
//! RootConfiguration.connectors
//!     → connectors.rs (validate brokers, build ConsumerSettings)
//!     → kafka.rs (register metrics, spawn poll loop)
//!     → lifecycle manager (one resource per consumer)
//!
//! Kafka client → ingress channel → poll loop → handler.rs (MessageHandler)
//!
//! aggregate.rs observes the registry and sums per-consumer counters.
//! ```
//!
//! # Design Decisions
//! - Broker protocol, partition assignment and offsets live behind the ingress channel
//! - Each consumer is released individually, most recently started first

pub mod aggregate;
pub mod connectors;
pub mod handler;
pub mod kafka;

pub use aggregate::ConsumerAggregate;
pub use connectors::{ConnectorError, Connectors};
pub use handler::{ConsumerRecord, HandlerError, LogHandler, MessageHandler};
pub use kafka::{ConsumerSettings, KafkaMessageConsumer};
