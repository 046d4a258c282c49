//! Passive health checking of consumers.
//!
//! # Responsibilities
//! - Observe the metric registry for consumer poll gauges
//! - Register a delay check per consumer, remove it when the consumer goes away
//!
//! # Design Decisions
//! - A consumer that has not polled within the allowed delay is unhealthy
//! - The check name is the consumer's metric prefix

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::health::state::{HealthCheck, HealthCheckRegistry, HealthStatus};
use crate::observability::metrics::{Gauge, Metric, RegistryListener};

/// Suffix of the gauge each consumer updates on every poll.
pub const LAST_POLL_SUFFIX: &str = ".last_poll_ms";

/// Registry listener turning consumer poll gauges into health checks.
pub struct ConsumerHealthListener {
    health: Arc<HealthCheckRegistry>,
    allowed_delay: Duration,
}

impl ConsumerHealthListener {
    pub fn new(health: Arc<HealthCheckRegistry>, allowed_delay: Duration) -> Self {
        Self {
            health,
            allowed_delay,
        }
    }
}

impl RegistryListener for ConsumerHealthListener {
    fn on_metric_added(&self, name: &str, metric: &Metric) {
        let (Some(consumer), Metric::Gauge(gauge)) = (name.strip_suffix(LAST_POLL_SUFFIX), metric)
        else {
            return;
        };
        self.health.register(
            consumer,
            Arc::new(ConsumerDelayCheck {
                last_poll: gauge.clone(),
                allowed_delay: self.allowed_delay,
            }),
        );
    }

    fn on_metric_removed(&self, name: &str) {
        if let Some(consumer) = name.strip_suffix(LAST_POLL_SUFFIX) {
            self.health.unregister(consumer);
        }
    }
}

/// Fails when the last poll is older than the allowed delay.
pub struct ConsumerDelayCheck {
    last_poll: Arc<Gauge>,
    allowed_delay: Duration,
}

impl HealthCheck for ConsumerDelayCheck {
    fn check(&self) -> HealthStatus {
        let last_poll = self.last_poll.get();
        if last_poll <= 0 {
            return HealthStatus::Unhealthy("consumer has not polled yet".to_string());
        }

        let delay_ms = now_millis().saturating_sub(last_poll).max(0) as u128;
        if delay_ms > self.allowed_delay.as_millis() {
            HealthStatus::Unhealthy(format!(
                "last poll {delay_ms} ms ago exceeds allowed {} ms",
                self.allowed_delay.as_millis()
            ))
        } else {
            HealthStatus::Healthy(Some(format!("last poll {delay_ms} ms ago")))
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::MetricRegistry;

    fn setup(allowed_ms: u64) -> (Arc<MetricRegistry>, Arc<HealthCheckRegistry>) {
        let metrics = Arc::new(MetricRegistry::new());
        let health = Arc::new(HealthCheckRegistry::new());
        metrics.add_listener(Arc::new(ConsumerHealthListener::new(
            health.clone(),
            Duration::from_millis(allowed_ms),
        )));
        (metrics, health)
    }

    #[test]
    fn test_registers_check_for_poll_gauge_only() {
        let (metrics, health) = setup(1_000);
        metrics.gauge("kafka.consumer.in.0.last_poll_ms").unwrap();
        metrics.counter("kafka.consumer.in.0.messages").unwrap();

        assert_eq!(health.names(), vec!["kafka.consumer.in.0"]);
    }

    #[test]
    fn test_recent_poll_is_healthy_stale_poll_is_not() {
        let (metrics, health) = setup(1_000);
        let fresh = metrics.gauge("fresh.last_poll_ms").unwrap();
        let stale = metrics.gauge("stale.last_poll_ms").unwrap();
        let never = metrics.gauge("never.last_poll_ms").unwrap();
        fresh.set(now_millis());
        stale.set(now_millis() - 5_000);
        never.set(0);

        let results = health.run_health_checks();

        assert!(results["fresh"].is_healthy());
        assert!(!results["stale"].is_healthy());
        assert_eq!(
            results["never"],
            HealthStatus::Unhealthy("consumer has not polled yet".into())
        );
    }

    #[test]
    fn test_removing_gauge_removes_check() {
        let (metrics, health) = setup(1_000);
        metrics.gauge("c.last_poll_ms").unwrap();
        metrics.remove("c.last_poll_ms");
        assert!(health.is_empty());
    }
}
