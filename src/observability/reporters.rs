//! Periodic metric reporters.
//!
//! # Responsibilities
//! - Log every registry value on a fixed interval
//! - Expose registry values on a Prometheus scrape endpoint
//!
//! # Design Decisions
//! - Each reporter is a tokio task stopped through its own `Shutdown`
//! - Reporters are lifecycle resources; closing one stops its tasks
//! - The Prometheus exporter is fed by copying snapshots into the `metrics` facade

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::lifecycle::{CloseError, Resource, Shutdown};
use crate::observability::metrics::{MetricRegistry, MetricValue};

/// Error starting a reporter.
#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("failed to build prometheus exporter: {0}")]
    Build(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid listen address '{0}'")]
    Address(String),

    #[error("a global metrics recorder is already installed")]
    RecorderInstalled,
}

/// Logs a snapshot of the registry at a fixed interval.
pub struct LogReporter {
    interval: Duration,
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl LogReporter {
    /// Start reporting. Must be called from within a Tokio runtime.
    pub fn start(registry: Arc<MetricRegistry>, interval: Duration) -> Self {
        let shutdown = Shutdown::new();
        let stop = shutdown.subscribe();
        let task = tokio::spawn(async move {
            run_periodic(interval, stop, || log_snapshot(&registry)).await;
        });
        tracing::info!(interval_secs = interval.as_secs(), "Log reporter started");
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

impl fmt::Display for LogReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogReporter(every {:?})", self.interval)
    }
}

impl Resource for LogReporter {
    fn close(self: Box<Self>) -> Result<(), CloseError> {
        self.shutdown.trigger();
        Ok(())
    }
}

fn log_snapshot(registry: &MetricRegistry) {
    for (name, value) in registry.snapshot() {
        match value {
            MetricValue::Counter(count) => tracing::info!(metric = %name, count, "counter"),
            MetricValue::Gauge(value) => tracing::info!(metric = %name, value, "gauge"),
        }
    }
}

/// Serves registry values on a Prometheus scrape endpoint.
pub struct PrometheusReporter {
    address: SocketAddr,
    shutdown: Shutdown,
    exporter: JoinHandle<()>,
    refresher: JoinHandle<()>,
}

impl PrometheusReporter {
    /// Install the global recorder and start serving.
    ///
    /// Must be called from within a Tokio runtime. Only one reporter can be
    /// started per process because the `metrics` recorder is global.
    pub fn start(
        registry: Arc<MetricRegistry>,
        address: SocketAddr,
        refresh: Duration,
    ) -> Result<Self, ReporterError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(address)
            .build()?;
        ::metrics::set_global_recorder(recorder).map_err(|_| ReporterError::RecorderInstalled)?;

        let exporter = tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::error!(error = ?e, "Prometheus exporter stopped");
            }
        });

        let shutdown = Shutdown::new();
        let stop = shutdown.subscribe();
        let refresher = tokio::spawn(async move {
            run_periodic(refresh, stop, || publish_snapshot(&registry)).await;
        });

        tracing::info!(address = %address, "Prometheus reporter started");
        Ok(Self {
            address,
            shutdown,
            exporter,
            refresher,
        })
    }
}

impl fmt::Display for PrometheusReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrometheusReporter({})", self.address)
    }
}

impl Resource for PrometheusReporter {
    fn close(self: Box<Self>) -> Result<(), CloseError> {
        self.shutdown.trigger();
        self.refresher.abort();
        self.exporter.abort();
        Ok(())
    }
}

fn publish_snapshot(registry: &MetricRegistry) {
    for (name, value) in registry.snapshot() {
        let name = prometheus_name(&name);
        match value {
            MetricValue::Counter(count) => ::metrics::counter!(name).absolute(count),
            MetricValue::Gauge(value) => ::metrics::gauge!(name).set(value as f64),
        }
    }
}

/// Map a dotted registry name onto the Prometheus name charset.
pub fn prometheus_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect()
}

/// Run `tick` on every interval until the stop signal fires.
pub(crate) async fn run_periodic<F>(period: Duration, mut stop: broadcast::Receiver<()>, mut tick: F)
where
    F: FnMut(),
{
    let mut ticker = time::interval(period);
    // The first tick completes immediately; reports start one period after startup.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => tick(),
            _ = stop.recv() => break,
        }
    }
}
