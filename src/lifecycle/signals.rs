//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for process termination (SIGTERM, SIGINT / Ctrl+C)
//! - Release every registered resource once termination is requested
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are installed before startup acquires anything, so a signal
//!   that arrives mid-startup still unwinds what was acquired

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::lifecycle::ResourceLifecycleManager;

/// Termination signal that was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

/// Installed termination handlers.
#[cfg(unix)]
#[derive(Debug)]
pub struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    /// Install the handlers. Must be called from within a Tokio runtime.
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait until the process is asked to terminate.
    pub async fn recv(&mut self) -> TerminationSignal {
        let signal = tokio::select! {
            _ = self.interrupt.recv() => TerminationSignal::Interrupt,
            _ = self.terminate.recv() => TerminationSignal::Terminate,
        };
        tracing::info!(signal = ?signal, "Shutdown signal received");
        signal
    }
}

/// Installed termination handlers.
#[cfg(windows)]
#[derive(Debug)]
pub struct TerminationSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl TerminationSignals {
    /// Install the handlers. Must be called from within a Tokio runtime.
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Wait until the process is asked to terminate.
    pub async fn recv(&mut self) -> TerminationSignal {
        self.ctrl_c.recv().await;
        tracing::info!("Shutdown signal received");
        TerminationSignal::Interrupt
    }
}

/// Spawn a task that runs `lifecycle.shutdown_all()` once `trigger` resolves.
///
/// The task yields whatever the trigger produced, after teardown has finished.
pub fn shutdown_on<F>(lifecycle: Arc<ResourceLifecycleManager>, trigger: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(async move {
        let received = trigger.await;
        lifecycle.shutdown_all();
        received
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::FnResource;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_trigger_releases_registered_resources() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let lifecycle = Arc::new(ResourceLifecycleManager::new());
        for name in ["metrics", "reporter"] {
            let log = log.clone();
            lifecycle.register(Box::new(FnResource::new(name, move || {
                log.lock().unwrap().push(name);
                Ok(())
            })));
        }

        let (tx, rx) = oneshot::channel::<()>();
        let handle = shutdown_on(lifecycle.clone(), rx);
        assert!(!lifecycle.is_shut_down());

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        assert!(lifecycle.is_shut_down());
        assert_eq!(*log.lock().unwrap(), vec!["reporter", "metrics"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_handlers() {
        assert!(TerminationSignals::install().is_ok());
    }
}
