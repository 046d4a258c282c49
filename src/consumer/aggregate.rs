//! Aggregate metrics across all consumers.

use std::sync::Arc;

use dashmap::DashMap;

use crate::consumer::kafka::METRIC_PREFIX;
use crate::observability::metrics::{Counter, Metric, MetricRegistry, MetricsError, RegistryListener};

pub const ACTIVE_CONSUMERS: &str = "kafka.consumers.active";
pub const TOTAL_MESSAGES: &str = "kafka.consumers.total_messages";
pub const TOTAL_ERRORS: &str = "kafka.consumers.total_errors";

/// Registry listener summing per-consumer counters into service-wide gauges.
#[derive(Default)]
pub struct ConsumerAggregate {
    messages: DashMap<String, Arc<Counter>>,
    errors: DashMap<String, Arc<Counter>>,
}

impl ConsumerAggregate {
    /// Create the aggregate, register its gauges and attach it as a listener.
    pub fn register(registry: &MetricRegistry) -> Result<Arc<Self>, MetricsError> {
        let aggregate = Arc::new(Self::default());

        let a = aggregate.clone();
        registry.derived_gauge(ACTIVE_CONSUMERS, move || a.active() as i64)?;
        let a = aggregate.clone();
        registry.derived_gauge(TOTAL_MESSAGES, move || a.total_messages() as i64)?;
        let a = aggregate.clone();
        registry.derived_gauge(TOTAL_ERRORS, move || a.total_errors() as i64)?;

        registry.add_listener(aggregate.clone());
        Ok(aggregate)
    }

    /// Number of consumers currently tracked.
    pub fn active(&self) -> usize {
        self.messages.len()
    }

    pub fn total_messages(&self) -> u64 {
        self.messages.iter().map(|c| c.value().get()).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.errors.iter().map(|c| c.value().get()).sum()
    }

    fn bucket(&self, name: &str) -> Option<(&DashMap<String, Arc<Counter>>, String)> {
        let rest = name.strip_prefix(METRIC_PREFIX)?.strip_prefix('.')?;
        if let Some(consumer) = rest.strip_suffix(".messages") {
            Some((&self.messages, consumer.to_string()))
        } else {
            rest.strip_suffix(".errors")
                .map(|consumer| (&self.errors, consumer.to_string()))
        }
    }
}

impl RegistryListener for ConsumerAggregate {
    fn on_metric_added(&self, name: &str, metric: &Metric) {
        if let (Some((bucket, consumer)), Metric::Counter(counter)) = (self.bucket(name), metric) {
            bucket.insert(consumer, counter.clone());
        }
    }

    fn on_metric_removed(&self, name: &str) {
        if let Some((bucket, consumer)) = self.bucket(name) {
            bucket.remove(&consumer);
        }
    }
}
