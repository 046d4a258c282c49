//! Metrics collection.
//!
//! # Responsibilities
//! - Hold named counters, gauges and derived gauges
//! - Notify registered listeners when metrics appear or disappear
//! - Produce consistent snapshots for the reporters
//!
//! # Metrics
//! - `kafka.consumer.<connector>.<n>.messages` (counter): records handled
//! - `kafka.consumer.<connector>.<n>.errors` (counter): handler failures
//! - `kafka.consumer.<connector>.<n>.last_poll_ms` (gauge): epoch millis of the last poll
//! - `kafka.consumers.*` (derived gauges): aggregates across consumers
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Listeners are explicit observers, invoked outside the map locks
//! - A newly added listener is replayed every existing metric

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

/// Errors from metric registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    #[error("metric '{name}' is already registered as a {existing}")]
    TypeMismatch { name: String, existing: &'static str },
}

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Gauge holding the last value set.
#[derive(Debug, Default)]
pub struct Gauge(AtomicI64);

impl Gauge {
    pub fn set(&self, value: i64) {
        self.0.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Value function backing a derived gauge.
pub type GaugeFn = Arc<dyn Fn() -> i64 + Send + Sync>;

/// A registered metric.
#[derive(Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    Derived(GaugeFn),
}

impl Metric {
    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Counter(_) => "counter",
            Metric::Gauge(_) | Metric::Derived(_) => "gauge",
        }
    }

    pub fn value(&self) -> MetricValue {
        match self {
            Metric::Counter(c) => MetricValue::Counter(c.get()),
            Metric::Gauge(g) => MetricValue::Gauge(g.get()),
            Metric::Derived(f) => MetricValue::Gauge(f()),
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.value())
    }
}

/// Point-in-time value of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(i64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Counter(v) => write!(f, "{v}"),
            MetricValue::Gauge(v) => write!(f, "{v}"),
        }
    }
}

/// Observer of registry changes.
pub trait RegistryListener: Send + Sync {
    fn on_metric_added(&self, _name: &str, _metric: &Metric) {}

    fn on_metric_removed(&self, _name: &str) {}
}

/// Shared aggregation point for all service metrics.
#[derive(Default)]
pub struct MetricRegistry {
    metrics: DashMap<String, Metric>,
    listeners: RwLock<Vec<Arc<dyn RegistryListener>>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a counter.
    pub fn counter(&self, name: &str) -> Result<Arc<Counter>, MetricsError> {
        let metric = self.get_or_insert(name, || Metric::Counter(Arc::default()))?;
        match metric {
            Metric::Counter(c) => Ok(c),
            other => Err(mismatch(name, &other)),
        }
    }

    /// Get or create a gauge.
    pub fn gauge(&self, name: &str) -> Result<Arc<Gauge>, MetricsError> {
        let metric = self.get_or_insert(name, || Metric::Gauge(Arc::default()))?;
        match metric {
            Metric::Gauge(g) => Ok(g),
            other => Err(mismatch(name, &other)),
        }
    }

    /// Register a gauge whose value is computed at read time.
    pub fn derived_gauge<F>(&self, name: &str, f: F) -> Result<(), MetricsError>
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        let metric = Metric::Derived(Arc::new(f));
        match self.metrics.entry(name.to_string()) {
            Entry::Occupied(existing) => Err(mismatch(name, existing.get())),
            Entry::Vacant(slot) => {
                slot.insert(metric.clone());
                self.notify_added(name, &metric);
                Ok(())
            }
        }
    }

    /// Remove a metric. Returns true if it existed.
    pub fn remove(&self, name: &str) -> bool {
        if self.metrics.remove(name).is_none() {
            return false;
        }
        for listener in self.listeners() {
            listener.on_metric_removed(name);
        }
        true
    }

    /// Attach an observer and replay the metrics registered so far.
    pub fn add_listener(&self, listener: Arc<dyn RegistryListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener.clone());

        let existing: Vec<(String, Metric)> = self
            .metrics
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        for (name, metric) in existing {
            listener.on_metric_added(&name, &metric);
        }
    }

    /// Current values, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, MetricValue)> {
        let metrics: Vec<(String, Metric)> = self
            .metrics
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let mut values: Vec<_> = metrics
            .into_iter()
            .map(|(name, metric)| (name, metric.value()))
            .collect();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        values
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    fn get_or_insert(
        &self,
        name: &str,
        create: impl FnOnce() -> Metric,
    ) -> Result<Metric, MetricsError> {
        let (metric, created) = match self.metrics.entry(name.to_string()) {
            Entry::Occupied(existing) => (existing.get().clone(), false),
            Entry::Vacant(slot) => {
                let metric = create();
                slot.insert(metric.clone());
                (metric, true)
            }
        };
        if created {
            self.notify_added(name, &metric);
        }
        Ok(metric)
    }

    fn notify_added(&self, name: &str, metric: &Metric) {
        for listener in self.listeners() {
            listener.on_metric_added(name, metric);
        }
    }

    fn listeners(&self) -> Vec<Arc<dyn RegistryListener>> {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("metrics", &self.metrics.len())
            .finish()
    }
}

fn mismatch(name: &str, existing: &Metric) -> MetricsError {
    MetricsError::TypeMismatch {
        name: name.to_string(),
        existing: existing.kind(),
    }
}
