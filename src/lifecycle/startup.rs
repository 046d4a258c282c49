//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Build the metric and health registries and attach their listeners
//! - Start the reporters and the connectors, registering each as a resource
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - A failure after configuration unwinds everything started so far, then surfaces

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{load_config, ApplicationProperties, ConfigError, RootConfiguration};
use crate::consumer::{ConnectorError, Connectors, ConsumerAggregate, LogHandler, MessageHandler};
use crate::health::{ConsumerHealthListener, HealthCheckRegistry, HealthReporter};
use crate::lifecycle::ResourceLifecycleManager;
use crate::observability::metrics::{MetricRegistry, MetricsError};
use crate::observability::reporters::{LogReporter, PrometheusReporter, ReporterError};

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("reporter error: {0}")]
    Reporter(#[from] ReporterError),

    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),
}

/// The running service.
pub struct Application {
    config: RootConfiguration,
    lifecycle: Arc<ResourceLifecycleManager>,
    metrics: Arc<MetricRegistry>,
    health: Arc<HealthCheckRegistry>,
    connectors: Connectors,
}

impl Application {
    /// Start the service with the default record handler.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(properties: ApplicationProperties) -> Result<Self, StartupError> {
        Self::start_with(properties, Arc::new(LogHandler))
    }

    /// Start the service, routing records to `handler`.
    pub fn start_with(
        properties: ApplicationProperties,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, StartupError> {
        Self::start_in(Arc::new(ResourceLifecycleManager::new()), properties, handler)
    }

    /// Start the service under a lifecycle manager the caller already shares,
    /// typically with a signal listener installed before startup began.
    pub fn start_in(
        lifecycle: Arc<ResourceLifecycleManager>,
        properties: ApplicationProperties,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, StartupError> {
        let path = &properties.consumer_configuration_path;
        tracing::info!(path = %path.display(), "Creating kafka consumer from config file");

        let config = load_config(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Error opening file");
            e
        })?;
        tracing::info!(config = ?config, "Config");

        Self::start_from_config_in(lifecycle, config, properties, handler)
    }

    /// Start from an already loaded configuration.
    pub fn start_from_config(
        config: RootConfiguration,
        properties: ApplicationProperties,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, StartupError> {
        Self::start_from_config_in(Arc::new(ResourceLifecycleManager::new()), config, properties, handler)
    }

    /// Start from an already loaded configuration under a shared lifecycle manager.
    ///
    /// If the manager is shut down while startup is running, every resource
    /// acquired afterwards is released on registration.
    pub fn start_from_config_in(
        lifecycle: Arc<ResourceLifecycleManager>,
        config: RootConfiguration,
        properties: ApplicationProperties,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, StartupError> {
        let metrics = Arc::new(MetricRegistry::new());
        let health = Arc::new(HealthCheckRegistry::new());

        let connectors = lifecycle.guard_startup(|lifecycle| {
            metrics.add_listener(Arc::new(ConsumerHealthListener::new(
                health.clone(),
                config.allowed_consumer_delay(),
            )));
            ConsumerAggregate::register(&metrics)?;

            lifecycle.register(Box::new(HealthReporter::start(
                health.clone(),
                config.health_reporting_interval(),
            )));

            if config.metrics.prometheus_enabled {
                let address: SocketAddr = config
                    .metrics
                    .prometheus_address
                    .parse()
                    .map_err(|_| ReporterError::Address(config.metrics.prometheus_address.clone()))?;
                lifecycle.register(Box::new(PrometheusReporter::start(
                    metrics.clone(),
                    address,
                    Duration::from_millis(config.metrics.prometheus_refresh_ms),
                )?));
            }

            lifecycle.register(Box::new(LogReporter::start(
                metrics.clone(),
                Duration::from_secs(config.metrics.log_interval_secs),
            )));

            let connectors = config.init_connectors_with(lifecycle, &metrics, &properties, handler)?;
            Ok::<_, StartupError>(connectors)
        })?;

        let summary: String = connectors
            .values()
            .flatten()
            .map(|consumer| format!("\n  {consumer}"))
            .collect();
        tracing::info!("Connectors:{summary}");
        if lifecycle.is_shut_down() {
            tracing::warn!("Shutdown requested during startup, resources already released");
        }
        tracing::info!(
            application = %properties.application_name,
            connectors = connectors.len(),
            resources = lifecycle.len(),
            "Application started"
        );

        Ok(Self {
            config,
            lifecycle,
            metrics,
            health,
            connectors,
        })
    }

    /// Release every resource in reverse order. Safe to call more than once.
    pub fn shutdown(&self) {
        self.lifecycle.shutdown_all();
    }

    pub fn config(&self) -> &RootConfiguration {
        &self.config
    }

    pub fn lifecycle(&self) -> &Arc<ResourceLifecycleManager> {
        &self.lifecycle
    }

    pub fn metrics(&self) -> &Arc<MetricRegistry> {
        &self.metrics
    }

    pub fn health(&self) -> &Arc<HealthCheckRegistry> {
        &self.health
    }

    pub fn connectors(&self) -> &Connectors {
        &self.connectors
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        self.lifecycle.shutdown_all();
    }
}
