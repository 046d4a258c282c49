//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Registries + listeners → Reporters → Connectors
//!     each started piece → resources.rs (register)
//!
//! Shutdown (resources.rs):
//!     Signal or startup failure → shutdown_all → close in reverse order
//!
//! Signals (signals.rs):
//!     handlers installed before startup → SIGTERM/SIGINT → shutdown_all
//!
//! Background tasks (shutdown.rs):
//!     Resource close → broadcast stop → task loop exits
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then observers, reporters, consumers
//! - Ordered shutdown: exact reverse of startup
//! - Shutdown runs once no matter how many triggers fire

pub mod resources;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use resources::{CloseError, FnResource, Resource, ResourceLifecycleManager};
pub use shutdown::Shutdown;
pub use startup::{Application, StartupError};
