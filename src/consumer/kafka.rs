//! A single consumer instance and its poll loop.
//!
//! # Responsibilities
//! - Own the ingress buffer a Kafka client feeds
//! - Hand each record to the handler, counting successes and failures
//! - Record the time of every poll for the delay health check
//! - Unregister its metrics when stopped
//!
//! # Design Decisions
//! - One tokio task per consumer, stopped through `Shutdown`
//! - A poll happens at least every `poll_timeout`, even when idle

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time;
use uuid::Uuid;

use crate::config::{ApplicationProperties, ConnectorConfig};
use crate::consumer::handler::{ConsumerRecord, MessageHandler};
use crate::health::passive::{now_millis, LAST_POLL_SUFFIX};
use crate::lifecycle::{CloseError, Resource, Shutdown};
use crate::observability::metrics::{Counter, Gauge, MetricRegistry, MetricsError};

/// Prefix of every per-consumer metric.
pub const METRIC_PREFIX: &str = "kafka.consumer";

/// Identity and tuning of one consumer instance.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub connector: String,
    pub index: usize,
    pub client_id: String,
    pub topic: String,
    pub group_id: String,
    pub bootstrap_servers: Vec<String>,
    pub poll_timeout: Duration,
    pub max_poll_records: usize,
}

impl ConsumerSettings {
    pub fn new(
        connector: &str,
        index: usize,
        config: &ConnectorConfig,
        properties: &ApplicationProperties,
    ) -> Self {
        let prefix = config
            .client_id
            .as_deref()
            .unwrap_or(&properties.application_name);
        let instance = Uuid::new_v4().simple().to_string();
        Self {
            connector: connector.to_string(),
            index,
            client_id: format!("{prefix}-{connector}-{index}-{}", &instance[..8]),
            topic: config.topic.clone(),
            group_id: config.group_id.clone(),
            bootstrap_servers: config.bootstrap_servers.clone(),
            poll_timeout: Duration::from_millis(config.poll_timeout_ms),
            max_poll_records: config.max_poll_records,
        }
    }

    /// Registry prefix for this instance's metrics.
    pub fn metric_prefix(&self) -> String {
        format!("{METRIC_PREFIX}.{}.{}", self.connector, self.index)
    }
}

struct ConsumerMetrics {
    messages: Arc<Counter>,
    errors: Arc<Counter>,
    last_poll: Arc<Gauge>,
}

/// A running consumer.
pub struct KafkaMessageConsumer {
    settings: ConsumerSettings,
    metric_names: [String; 3],
    registry: Arc<MetricRegistry>,
    ingress: mpsc::Sender<ConsumerRecord>,
    shutdown: Shutdown,
    stopped: AtomicBool,
}

impl KafkaMessageConsumer {
    /// Register metrics and spawn the poll loop. Must be called from within a Tokio runtime.
    pub fn start(
        settings: ConsumerSettings,
        registry: Arc<MetricRegistry>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Arc<Self>, MetricsError> {
        let prefix = settings.metric_prefix();
        let metric_names = [
            format!("{prefix}.messages"),
            format!("{prefix}.errors"),
            format!("{prefix}{LAST_POLL_SUFFIX}"),
        ];

        let messages = registry.counter(&metric_names[0])?;
        let errors = registry
            .counter(&metric_names[1])
            .inspect_err(|_| unregister(&registry, &metric_names[..1]))?;
        let last_poll = registry
            .gauge(&metric_names[2])
            .inspect_err(|_| unregister(&registry, &metric_names[..2]))?;
        let metrics = ConsumerMetrics {
            messages,
            errors,
            last_poll,
        };
        metrics.last_poll.set(now_millis());

        let (ingress, records) = mpsc::channel(settings.max_poll_records.max(1));
        let shutdown = Shutdown::new();
        let consumer = Arc::new(Self {
            settings,
            metric_names,
            registry,
            ingress,
            shutdown,
            stopped: AtomicBool::new(false),
        });

        let description = consumer.to_string();
        let stop = consumer.shutdown.subscribe();
        let poll_timeout = consumer.settings.poll_timeout;
        tokio::spawn(poll_loop(records, stop, handler, metrics, poll_timeout, description));

        tracing::info!(consumer = %consumer, "Consumer started");
        Ok(consumer)
    }

    pub fn settings(&self) -> &ConsumerSettings {
        &self.settings
    }

    /// Sender feeding records into this consumer.
    pub fn ingress(&self) -> mpsc::Sender<ConsumerRecord> {
        self.ingress.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stop the poll loop and unregister the metrics. Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.trigger();
        unregister(&self.registry, &self.metric_names);
        tracing::info!(consumer = %self, "Consumer stopped");
    }
}

impl fmt::Display for KafkaMessageConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.settings;
        write!(
            f,
            "KafkaMessageConsumer[connector={}, topic={}, group={}, client={}, servers={}]",
            s.connector,
            s.topic,
            s.group_id,
            s.client_id,
            s.bootstrap_servers.join(",")
        )
    }
}

impl fmt::Debug for KafkaMessageConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaMessageConsumer")
            .field("settings", &self.settings)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Resource for Arc<KafkaMessageConsumer> {
    fn close(self: Box<Self>) -> Result<(), CloseError> {
        self.stop();
        Ok(())
    }
}

fn unregister(registry: &MetricRegistry, names: &[String]) {
    for name in names {
        registry.remove(name);
    }
}

async fn poll_loop(
    mut records: mpsc::Receiver<ConsumerRecord>,
    mut stop: broadcast::Receiver<()>,
    handler: Arc<dyn MessageHandler>,
    metrics: ConsumerMetrics,
    poll_timeout: Duration,
    description: String,
) {
    loop {
        metrics.last_poll.set(now_millis());
        tokio::select! {
            record = records.recv() => {
                let Some(record) = record else { break };
                let position = record.to_string();
                match handler.handle(record).await {
                    Ok(()) => metrics.messages.inc(),
                    Err(e) => {
                        metrics.errors.inc();
                        tracing::warn!(consumer = %description, record = %position, error = %e, "Record processing failed");
                    }
                }
            }
            _ = time::sleep(poll_timeout) => {}
            _ = stop.recv() => break,
        }
    }
    tracing::debug!(consumer = %description, "Poll loop exited");
}
