//! Health check registry and result types.
//!
//! # States
//! - Healthy: check passed, optional detail message
//! - Unhealthy: check failed, with a reason
//!
//! # Design Decisions
//! - Checks are synchronous and cheap (they read gauges, they do not do I/O)
//! - Results are returned sorted by check name for stable reports

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

/// Outcome of a single health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy(Option<String>),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn healthy() -> Self {
        HealthStatus::Healthy(None)
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy(None) => f.write_str("healthy"),
            HealthStatus::Healthy(Some(msg)) => write!(f, "healthy: {msg}"),
            HealthStatus::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// A named probe of some part of the service.
pub trait HealthCheck: Send + Sync {
    fn check(&self) -> HealthStatus;
}

impl<F> HealthCheck for F
where
    F: Fn() -> HealthStatus + Send + Sync,
{
    fn check(&self) -> HealthStatus {
        self()
    }
}

/// Registry of named health checks.
#[derive(Default)]
pub struct HealthCheckRegistry {
    checks: DashMap<String, Arc<dyn HealthCheck>>,
}

impl HealthCheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check, replacing any check with the same name.
    pub fn register(&self, name: impl Into<String>, check: Arc<dyn HealthCheck>) {
        let name = name.into();
        tracing::debug!(check = %name, "Health check registered");
        self.checks.insert(name, check);
    }

    /// Remove a check. Returns true if it existed.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.checks.remove(name).is_some();
        if removed {
            tracing::debug!(check = %name, "Health check unregistered");
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.checks.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Run every registered check.
    pub fn run_health_checks(&self) -> BTreeMap<String, HealthStatus> {
        // Clone out first so checks never run under a map lock.
        let checks: Vec<(String, Arc<dyn HealthCheck>)> = self
            .checks
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        checks
            .into_iter()
            .map(|(name, check)| (name, check.check()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl fmt::Debug for HealthCheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheckRegistry")
            .field("checks", &self.names())
            .finish()
    }
}
