//! Read-only view of the store for the query and presentation surfaces.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::state::record::{address_host, StatusRecord};
use crate::state::store::StateStore;

/// Thin, cloneable handle over the store's read operations.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    store: Arc<StateStore>,
}

impl SnapshotReader {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Every current record, ordered by identity.
    pub fn current_snapshot(&self) -> Vec<StatusRecord> {
        self.store.snapshot()
    }

    /// Every current record, keyed by identity.
    pub fn by_identity(&self) -> BTreeMap<String, StatusRecord> {
        self.store.snapshot_map()
    }

    pub fn get(&self, identity: &str) -> Option<StatusRecord> {
        self.store.get(identity)
    }

    pub fn instance_count(&self) -> usize {
        self.store.len()
    }

    /// Whether `host:port` is the probe endpoint of a currently monitored
    /// instance. Instances without an explicit port in their address listen
    /// on `default_port`.
    pub fn is_monitored_endpoint(&self, host: &str, port: u16, default_port: u16) -> bool {
        let host = address_host(host);
        !host.is_empty()
            && self.store.snapshot().iter().any(|r| {
                !r.address.is_empty()
                    && r.address_host().eq_ignore_ascii_case(host)
                    && r.address_port().unwrap_or(default_port) == port
            })
    }
}
