//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! interval tick
//!     → Discovery::list(selector)
//!     → per instance: group tag, StatusRecord, StatusFetcher::fetch_status (running only)
//!     → StateStore::apply_cycle (upsert all, prune the rest)
//!     → ReconcilerStatus on the watch channel
//! ```
//!
//! # Design Decisions
//! - One background task is the only writer to the store
//! - Discovery failures skip the cycle; the next tick is the retry
//! - Group tag derivation is a plain function, replaceable per reconciler

pub mod group_tag;
pub mod reconciler;

pub use group_tag::{replica_set_tag, GroupTagFn};
pub use reconciler::{CycleReport, Reconciler, ReconcilerState, ReconcilerStatus};
