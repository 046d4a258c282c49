//! Periodic health reporting.
//!
//! # Responsibilities
//! - Periodically run every registered health check
//! - Log failing checks and a summary

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::health::state::HealthCheckRegistry;
use crate::lifecycle::{CloseError, Resource, Shutdown};
use crate::observability::reporters::run_periodic;

/// Runs the health checks on an interval; a lifecycle resource.
pub struct HealthReporter {
    interval: Duration,
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl HealthReporter {
    /// Start reporting. Must be called from within a Tokio runtime.
    pub fn start(health: Arc<HealthCheckRegistry>, interval: Duration) -> Self {
        let shutdown = Shutdown::new();
        let stop = shutdown.subscribe();

        tracing::info!(interval_ms = interval.as_millis() as u64, "Health reporter starting");
        let task = tokio::spawn(async move {
            run_periodic(interval, stop, || {
                report(&health);
            })
            .await;
            tracing::info!("Health reporter received shutdown signal, exiting loop");
        });

        Self {
            interval,
            shutdown,
            task,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Run all checks once and log the outcome. Returns the number of failing checks.
pub fn report(health: &HealthCheckRegistry) -> usize {
    let results = health.run_health_checks();
    let total = results.len();
    let mut unhealthy = 0;

    for (name, status) in &results {
        if status.is_healthy() {
            tracing::debug!(check = %name, status = %status, "Health check passed");
        } else {
            unhealthy += 1;
            tracing::warn!(check = %name, status = %status, "Health check failed");
        }
    }

    if unhealthy > 0 {
        tracing::warn!(total, unhealthy, "Health report");
    } else {
        tracing::info!(total, "Health report: all checks healthy");
    }
    unhealthy
}

impl fmt::Display for HealthReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HealthReporter(every {:?})", self.interval)
    }
}

impl Resource for HealthReporter {
    fn close(self: Box<Self>) -> Result<(), CloseError> {
        self.shutdown.trigger();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::state::HealthStatus;

    #[test]
    fn test_report_counts_unhealthy() {
        let health = HealthCheckRegistry::new();
        health.register("ok", Arc::new(HealthStatus::healthy));
        health.register("bad", Arc::new(|| HealthStatus::Unhealthy("down".into())));
        assert_eq!(report(&health), 1);
    }

    #[tokio::test]
    async fn test_reporter_runs_checks_until_closed() {
        let health = Arc::new(HealthCheckRegistry::new());
        let runs = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let r = runs.clone();
        health.register(
            "probe",
            Arc::new(move || {
                r.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                HealthStatus::healthy()
            }),
        );

        let reporter = HealthReporter::start(health, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(40)).await;
        Box::new(reporter).close().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_close = runs.load(std::sync::atomic::Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(after_close >= 2);
        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), after_close);
    }
}
