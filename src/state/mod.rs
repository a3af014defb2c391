//! Shared instance state.
//!
//! # Data Flow
//! ```text
//! Reconciler (sole writer)
//!     → StateStore::apply_cycle (upserts + prune, one write lock)
//!
//! SnapshotReader (any number of readers)
//!     → StateStore::snapshot (shared read lock, cloned out)
//!     → /api/pods, dashboard, action forwarder target checks
//! ```
//!
//! # Design Decisions
//! - The store is an explicit value shared through `Arc`, never a global
//! - Records are rebuilt from discovery every cycle; nothing is persisted

pub mod record;
pub mod snapshot;
pub mod store;

pub use record::{ProbeOutcome, StatusRecord};
pub use snapshot::SnapshotReader;
pub use store::{CycleApplied, StateStore};
