//! Connector construction from configuration.
//!
//! # Responsibilities
//! - Build every configured connector's consumers, in connector-name order
//! - Hand each started consumer to the lifecycle manager
//! - Reject unusable broker addresses before any consumer of that connector starts

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{ApplicationProperties, RootConfiguration};
use crate::consumer::handler::{LogHandler, MessageHandler};
use crate::consumer::kafka::{ConsumerSettings, KafkaMessageConsumer};
use crate::lifecycle::ResourceLifecycleManager;
use crate::observability::metrics::{MetricRegistry, MetricsError};

/// Consumers grouped by connector name.
pub type Connectors = BTreeMap<String, Vec<Arc<KafkaMessageConsumer>>>;

/// Errors building connectors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("connector '{connector}': invalid bootstrap server '{server}'")]
    InvalidBootstrapServer { connector: String, server: String },

    #[error("connector metrics: {0}")]
    Metrics(#[from] MetricsError),
}

impl RootConfiguration {
    /// Build and start every connector with the default [`LogHandler`].
    pub fn init_connectors(
        &self,
        lifecycle: &ResourceLifecycleManager,
        metrics: &Arc<MetricRegistry>,
        properties: &ApplicationProperties,
    ) -> Result<Connectors, ConnectorError> {
        self.init_connectors_with(lifecycle, metrics, properties, Arc::new(LogHandler))
    }

    /// Build and start every connector, routing records to `handler`.
    ///
    /// Consumers started before a failure stay registered with `lifecycle`;
    /// the caller is expected to unwind it.
    pub fn init_connectors_with(
        &self,
        lifecycle: &ResourceLifecycleManager,
        metrics: &Arc<MetricRegistry>,
        properties: &ApplicationProperties,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Connectors, ConnectorError> {
        let mut connectors = Connectors::new();

        for (name, config) in &self.connectors {
            for server in &config.bootstrap_servers {
                if !is_valid_server(server) {
                    return Err(ConnectorError::InvalidBootstrapServer {
                        connector: name.clone(),
                        server: server.clone(),
                    });
                }
            }

            let mut consumers = Vec::with_capacity(config.consumers);
            for index in 0..config.consumers {
                let settings = ConsumerSettings::new(name, index, config, properties);
                let consumer = KafkaMessageConsumer::start(settings, metrics.clone(), handler.clone())?;
                lifecycle.register(Box::new(consumer.clone()));
                consumers.push(consumer);
            }

            tracing::info!(connector = %name, topic = %config.topic, consumers = consumers.len(), "Connector initialized");
            connectors.insert(name.clone(), consumers);
        }

        Ok(connectors)
    }
}

/// `host:port` with a non-empty host and a non-zero port.
fn is_valid_server(server: &str) -> bool {
    match server.rsplit_once(':') {
        Some((host, port)) => {
            !host.trim().is_empty() && matches!(port.parse::<u16>(), Ok(p) if p > 0)
        }
        None => false,
    }
}
