//! Concurrency-safe status store.
//!
//! # Responsibilities
//! - Hold at most one `StatusRecord` per identity
//! - Serve independent, ordered snapshots to any number of readers
//! - Apply a whole reconciliation cycle (upserts + prune) atomically
//!
//! # Design Decisions
//! - `RwLock<BTreeMap>`: readers share the lock, writers are serialized,
//!   and iteration order is the identity order
//! - Snapshots are cloned under the read lock and iterated without it
//! - Last-checked timestamps never move backwards for an identity
//! - A poisoned lock is recovered: every write is a single map operation,
//!   so the map is never left half-updated

use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::state::record::StatusRecord;

/// Counts from applying one cycle to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleApplied {
    pub upserted: usize,
    pub pruned: usize,
}

/// Mapping from instance identity to its last-known record.
#[derive(Debug, Default)]
pub struct StateStore {
    records: RwLock<BTreeMap<String, StatusRecord>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, StatusRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, StatusRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the record for `record.name`.
    pub fn upsert(&self, record: StatusRecord) {
        let mut records = self.write();
        insert_monotonic(&mut records, record);
    }

    /// Delete the record for `identity`, if present.
    pub fn remove(&self, identity: &str) -> Option<StatusRecord> {
        self.write().remove(identity)
    }

    /// Look up a single record.
    pub fn get(&self, identity: &str) -> Option<StatusRecord> {
        self.read().get(identity).cloned()
    }

    /// Independent copy of every record, ordered by identity.
    pub fn snapshot(&self) -> Vec<StatusRecord> {
        self.read().values().cloned().collect()
    }

    /// Independent copy of every record, keyed by identity.
    pub fn snapshot_map(&self) -> BTreeMap<String, StatusRecord> {
        self.read().clone()
    }

    /// Remove every record whose identity is not in `keep`. Returns the number removed.
    pub fn prune_except(&self, keep: &HashSet<String>) -> usize {
        let mut records = self.write();
        prune(&mut records, keep)
    }

    /// Upsert all `records` and prune everything else under one write lock.
    ///
    /// Readers observe either the state before the cycle or after it, never a mix.
    pub fn apply_cycle(&self, records: Vec<StatusRecord>) -> CycleApplied {
        let keep: HashSet<String> = records.iter().map(|r| r.name.clone()).collect();
        let upserted = records.len();

        let mut map = self.write();
        for record in records {
            insert_monotonic(&mut map, record);
        }
        let pruned = prune(&mut map, &keep);

        CycleApplied { upserted, pruned }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

fn insert_monotonic(map: &mut BTreeMap<String, StatusRecord>, mut record: StatusRecord) {
    if let Some(previous) = map.get(&record.name) {
        if previous.last_checked > record.last_checked {
            record.last_checked = previous.last_checked;
        }
    }
    map.insert(record.name.clone(), record);
}

fn prune(map: &mut BTreeMap<String, StatusRecord>, keep: &HashSet<String>) -> usize {
    let before = map.len();
    map.retain(|identity, _| keep.contains(identity));
    before - map.len()
}
