//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → selector, discovery backend, probe client → store
//!         → reconciler task → HTTP listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger → reconciler leaves its loop → server drains connections → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Any startup error is fatal; runtime errors never are

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_discovery, run, Monitor, StartupError};
