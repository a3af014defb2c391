//! Shutdown coordination for the monitor.
//!
//! # Responsibilities
//! - Fan one stop signal out to the reconciler loop and the HTTP server
//! - Report how many tasks were told to stop, for drain logging
//!
//! # Design Decisions
//! - Triggering twice is harmless; late subscribers miss the signal, so
//!   every task subscribes before `Monitor::serve` can trigger

use tokio::sync::broadcast;

/// Broadcast stop signal shared by every long-running task. Clones share the
/// same channel.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Returns how many were still listening.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }

    /// Subscribers that have not yet dropped their receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
