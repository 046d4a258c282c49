//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the consumer service.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Root configuration for the consumer service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RootConfiguration {
    /// Maximum time a consumer may go without polling before it is reported unhealthy.
    #[serde(alias = "allowedConsumerDelayMs")]
    pub allowed_consumer_delay_ms: u64,

    /// Interval between health reports.
    #[serde(alias = "healthReportingIntervalMs")]
    pub health_reporting_interval_ms: u64,

    /// Metrics reporter settings.
    pub metrics: MetricsConfig,

    /// Connector definitions, keyed by connector name.
    pub connectors: BTreeMap<String, ConnectorConfig>,
}

impl Default for RootConfiguration {
    fn default() -> Self {
        Self {
            allowed_consumer_delay_ms: 300_000,
            health_reporting_interval_ms: 60_000,
            metrics: MetricsConfig::default(),
            connectors: BTreeMap::new(),
        }
    }
}

impl RootConfiguration {
    pub fn allowed_consumer_delay(&self) -> Duration {
        Duration::from_millis(self.allowed_consumer_delay_ms)
    }

    pub fn health_reporting_interval(&self) -> Duration {
        Duration::from_millis(self.health_reporting_interval_ms)
    }
}

/// Metrics reporter configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Interval between log reports in seconds.
    pub log_interval_secs: u64,

    /// Expose metrics on a Prometheus scrape endpoint.
    pub prometheus_enabled: bool,

    /// Prometheus endpoint bind address.
    pub prometheus_address: String,

    /// How often registry values are copied to the Prometheus exporter, in milliseconds.
    pub prometheus_refresh_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            log_interval_secs: 60,
            prometheus_enabled: false,
            prometheus_address: "0.0.0.0:9090".to_string(),
            prometheus_refresh_ms: 5_000,
        }
    }
}

/// A connector: a named group of consumers reading one topic.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// Kafka brokers as `host:port`.
    #[serde(alias = "bootstrapServers")]
    pub bootstrap_servers: Vec<String>,

    /// Topic to consume.
    pub topic: String,

    /// Consumer group id.
    #[serde(alias = "groupId")]
    pub group_id: String,

    /// Number of consumer instances to run.
    #[serde(default = "default_consumers")]
    pub consumers: usize,

    /// Poll timeout in milliseconds.
    #[serde(default = "default_poll_timeout_ms", alias = "pollTimeoutMs")]
    pub poll_timeout_ms: u64,

    /// Capacity of each consumer's ingress buffer.
    #[serde(default = "default_max_poll_records", alias = "maxPollRecords")]
    pub max_poll_records: usize,

    /// Client id prefix; defaults to the application name.
    #[serde(default, alias = "clientId")]
    pub client_id: Option<String>,
}

fn default_consumers() -> usize {
    1
}

fn default_poll_timeout_ms() -> u64 {
    1_000
}

fn default_max_poll_records() -> usize {
    500
}

/// Process-level properties, independent of the configuration file.
#[derive(Debug, Clone)]
pub struct ApplicationProperties {
    /// Path of the consumer configuration file.
    pub consumer_configuration_path: PathBuf,

    /// Name used in client ids and log lines.
    pub application_name: String,
}

impl ApplicationProperties {
    pub const DEFAULT_APPLICATION_NAME: &'static str = "fhir-submission";

    pub fn new(consumer_configuration_path: impl Into<PathBuf>) -> Self {
        Self {
            consumer_configuration_path: consumer_configuration_path.into(),
            application_name: Self::DEFAULT_APPLICATION_NAME.to_string(),
        }
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }
}
