//! Kafka FHIR submission consumer service library.

pub mod cli;
pub mod config;
pub mod consumer;
pub mod health;
pub mod lifecycle;
pub mod observability;

pub use config::schema::RootConfiguration;
pub use lifecycle::{Application, ResourceLifecycleManager};
