//! Ordered, failure-isolated release of startup resources.
//!
//! # Responsibilities
//! - Record every resource opened during startup, in acquisition order
//! - Release them in reverse order on shutdown
//! - Keep going when a single release fails
//! - Run the release loop at most once, whichever trigger fires first
//!
//! # Design Decisions
//! - `close` consumes the handle, so a handle cannot be released twice
//! - The one-shot guard is an atomic swap made under the teardown lock
//! - Later shutdown callers block on the teardown lock until the first one finishes
//! - Release failures (errors and panics) are logged, never propagated

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Error produced by a failed release.
pub type CloseError = Box<dyn std::error::Error + Send + Sync>;

/// A resource that must be released explicitly.
///
/// The `Display` output is used as the resource description in log lines.
pub trait Resource: fmt::Display + Send {
    /// Release the resource.
    fn close(self: Box<Self>) -> Result<(), CloseError>;
}

/// Adapter turning a name and a closure into a [`Resource`].
pub struct FnResource<F> {
    name: String,
    release: F,
}

impl<F> FnResource<F>
where
    F: FnOnce() -> Result<(), CloseError> + Send,
{
    pub fn new(name: impl Into<String>, release: F) -> Self {
        Self {
            name: name.into(),
            release,
        }
    }
}

impl<F> fmt::Display for FnResource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<F> Resource for FnResource<F>
where
    F: FnOnce() -> Result<(), CloseError> + Send,
{
    fn close(self: Box<Self>) -> Result<(), CloseError> {
        (self.release)()
    }
}

/// Owner of every resource acquired during startup.
#[derive(Default)]
pub struct ResourceLifecycleManager {
    resources: Mutex<Vec<Box<dyn Resource>>>,
    /// Held for the whole release loop.
    teardown: Mutex<()>,
    shut_down: AtomicBool,
}

impl ResourceLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a freshly acquired resource.
    ///
    /// A resource registered after shutdown has already run is closed on the spot.
    pub fn register(&self, resource: Box<dyn Resource>) {
        let mut resources = self.lock();
        if self.shut_down.load(Ordering::SeqCst) {
            drop(resources);
            tracing::warn!(resource = %resource, "Resource registered after shutdown, closing immediately");
            close_isolated(resource);
            return;
        }
        tracing::debug!(resource = %resource, position = resources.len() + 1, "Resource registered");
        resources.push(resource);
    }

    /// Release every registered resource in reverse registration order.
    ///
    /// Only the first call does any work. A concurrent caller waits until that
    /// work is done, so every caller returns only after each resource has been
    /// attempted. Must not be called from inside a resource's `close`.
    pub fn shutdown_all(&self) {
        let _teardown = self.teardown.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::debug!("Shutdown already performed, ignoring");
            return;
        }

        let resources = std::mem::take(&mut *self.lock());
        tracing::info!(count = resources.len(), "Shutting down resources");

        let mut failures = 0usize;
        for resource in resources.into_iter().rev() {
            if !close_isolated(resource) {
                failures += 1;
            }
        }

        if failures > 0 {
            tracing::warn!(failures, "Shutdown finished with release errors");
        } else {
            tracing::info!("Shutdown finished");
        }
    }

    /// Run a startup sequence, unwinding everything registered so far if it fails.
    ///
    /// The original error is returned after cleanup completes.
    pub fn guard_startup<T, E, F>(&self, init: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: fmt::Display,
    {
        match init(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(error = %e, "Error starting app");
                self.shutdown_all();
                Err(e)
            }
        }
    }

    /// Number of resources currently awaiting release.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<dyn Resource>>> {
        self.resources.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ResourceLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLifecycleManager")
            .field("registered", &self.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Close one resource, containing both errors and panics. Returns true on success.
fn close_isolated(resource: Box<dyn Resource>) -> bool {
    let name = resource.to_string();
    tracing::info!(resource = %name, "Closing resource");

    match panic::catch_unwind(AssertUnwindSafe(move || resource.close())) {
        Ok(Ok(())) => {
            tracing::info!(resource = %name, "Resource closed");
            true
        }
        Ok(Err(e)) => {
            tracing::error!(resource = %name, error = %e, "Error shutting down resource");
            false
        }
        Err(_) => {
            tracing::error!(resource = %name, "Resource panicked while shutting down");
            false
        }
    }
}
