//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, consumer counts > 0)
//! - Check each connector names a topic, a group and at least one broker
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RootConfiguration → Result<(), Vec<ValidationError>>
//! - Broker address syntax is checked when consumers are built, not here

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RootConfiguration;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: String },

    #[error("connector '{connector}': {field} must not be empty")]
    Empty { connector: String, field: &'static str },

    #[error("invalid prometheus address '{0}'")]
    PrometheusAddress(String),
}

pub fn validate_config(config: &RootConfiguration) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let zero = |field: &str| ValidationError::Zero {
        field: field.to_string(),
    };

    if config.allowed_consumer_delay_ms == 0 {
        errors.push(zero("allowed_consumer_delay_ms"));
    }
    if config.health_reporting_interval_ms == 0 {
        errors.push(zero("health_reporting_interval_ms"));
    }
    if config.metrics.log_interval_secs == 0 {
        errors.push(zero("metrics.log_interval_secs"));
    }
    if config.metrics.prometheus_enabled {
        if config.metrics.prometheus_refresh_ms == 0 {
            errors.push(zero("metrics.prometheus_refresh_ms"));
        }
        if config.metrics.prometheus_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::PrometheusAddress(
                config.metrics.prometheus_address.clone(),
            ));
        }
    }

    for (name, connector) in &config.connectors {
        let empty = |field| ValidationError::Empty {
            connector: name.clone(),
            field,
        };
        if connector.topic.trim().is_empty() {
            errors.push(empty("topic"));
        }
        if connector.group_id.trim().is_empty() {
            errors.push(empty("group_id"));
        }
        if connector.bootstrap_servers.is_empty() {
            errors.push(empty("bootstrap_servers"));
        }
        if connector.consumers == 0 {
            errors.push(zero(&format!("connectors.{name}.consumers")));
        }
        if connector.poll_timeout_ms == 0 {
            errors.push(zero(&format!("connectors.{name}.poll_timeout_ms")));
        }
        if connector.max_poll_records == 0 {
            errors.push(zero(&format!("connectors.{name}.max_poll_records")));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
