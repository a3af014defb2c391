//! The discovery → fetch → merge loop.
//!
//! # Responsibilities
//! - Tick on a fixed interval until shutdown
//! - List instances, probe the running ones, merge into the store
//! - Prune identities that discovery no longer reports
//!
//! # State Machine
//! ```text
//! Idle ──tick──▶ Cycling ──pass complete──▶ Idle
//!   └──────────── shutdown ──────────────▶ Stopped
//! ```
//!
//! # Design Decisions
//! - A discovery failure aborts the cycle without touching the store
//! - A fetch failure is recorded on that instance only
//! - Fetches fan out with bounded concurrency; the cycle result is applied
//!   to the store in one step
//! - Shutdown is checked at every wait boundary; in-flight fetches finish
//!   under their own timeout

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::{self, MissedTickBehavior};

use crate::config::ReconcilerConfig;
use crate::discovery::{Discovery, DiscoveryError, InstanceDescriptor, LabelSelector};
use crate::observability::metrics;
use crate::probe::StatusFetcher;
use crate::reconcile::group_tag::{replica_set_tag, GroupTagFn};
use crate::state::{ProbeOutcome, StateStore, StatusRecord};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilerState {
    Idle,
    Cycling,
    Stopped,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub discovered: usize,
    pub reported: usize,
    pub failed: usize,
    pub pruned: usize,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Published after every state change.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcilerStatus {
    pub state: ReconcilerState,
    pub cycles: u64,
    pub last_cycle: Option<CycleReport>,
    pub last_error: Option<String>,
}

impl Default for ReconcilerStatus {
    fn default() -> Self {
        Self {
            state: ReconcilerState::Idle,
            cycles: 0,
            last_cycle: None,
            last_error: None,
        }
    }
}

/// Keeps the store in line with discovery.
pub struct Reconciler {
    discovery: Arc<dyn Discovery>,
    fetcher: Arc<dyn StatusFetcher>,
    store: Arc<StateStore>,
    selector: LabelSelector,
    interval: Duration,
    max_concurrent_fetches: usize,
    group_tag: GroupTagFn,
    status: watch::Sender<ReconcilerStatus>,
}

impl Reconciler {
    pub fn new(
        discovery: Arc<dyn Discovery>,
        fetcher: Arc<dyn StatusFetcher>,
        store: Arc<StateStore>,
        selector: LabelSelector,
        config: &ReconcilerConfig,
    ) -> Self {
        let (status, _) = watch::channel(ReconcilerStatus::default());
        Self {
            discovery,
            fetcher,
            store,
            selector,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
            group_tag: replica_set_tag,
            status,
        }
    }

    /// Replace the group tag policy.
    pub fn with_group_tag(mut self, policy: GroupTagFn) -> Self {
        self.group_tag = policy;
        self
    }

    /// Override the tick interval (sub-second intervals are allowed here).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Follow state changes and cycle reports.
    pub fn subscribe(&self) -> watch::Receiver<ReconcilerStatus> {
        self.status.subscribe()
    }

    /// Run until `shutdown` fires (or its sender is dropped).
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            backend = self.discovery.name(),
            selector = %self.selector,
            interval_ms = self.interval.as_millis() as u64,
            "Reconciler starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Reconciler received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.set_state(ReconcilerState::Cycling);
                    match self.run_cycle().await {
                        Ok(report) => self.status.send_modify(|s| {
                            s.cycles += 1;
                            s.last_cycle = Some(report);
                            s.last_error = None;
                        }),
                        Err(e) => {
                            tracing::error!(error = %e, "Discovery failed, skipping cycle");
                            self.status.send_modify(|s| s.last_error = Some(e.to_string()));
                        }
                    }
                    self.set_state(ReconcilerState::Idle);
                }
            }
        }

        self.set_state(ReconcilerState::Stopped);
    }

    fn set_state(&self, state: ReconcilerState) {
        self.status.send_modify(|s| s.state = state);
    }

    /// One discovery → fetch → merge → prune pass.
    pub async fn run_cycle(&self) -> Result<CycleReport, DiscoveryError> {
        let started = Instant::now();

        let descriptors = match self.discovery.list(&self.selector).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                metrics::record_cycle("discovery_error", started.elapsed());
                return Err(e);
            }
        };
        let discovered = descriptors.len();

        let records: Vec<StatusRecord> = stream::iter(descriptors)
            .map(|descriptor| self.observe(descriptor))
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        let reported = records
            .iter()
            .filter(|r| matches!(r.outcome, ProbeOutcome::Reported(_)))
            .count();
        let failed = records
            .iter()
            .filter(|r| matches!(r.outcome, ProbeOutcome::Failed(_)))
            .count();

        let applied = self.store.apply_cycle(records);
        let elapsed = started.elapsed();

        metrics::record_cycle("ok", elapsed);
        metrics::record_store_size(self.store.len());

        tracing::debug!(
            discovered,
            reported,
            failed,
            pruned = applied.pruned,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cycle complete"
        );

        Ok(CycleReport {
            discovered,
            reported,
            failed,
            pruned: applied.pruned,
            finished_at: Utc::now(),
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    async fn observe(&self, descriptor: InstanceDescriptor) -> StatusRecord {
        let tag = (self.group_tag)(&descriptor.name);
        let record = StatusRecord::observed(&descriptor, tag, Utc::now());
        if !record.should_probe() {
            return record;
        }

        match self.fetcher.fetch_status(&record.address).await {
            Ok(status) => record.with_outcome(ProbeOutcome::Reported(status)),
            Err(e) => {
                tracing::warn!(
                    pod = %record.name,
                    address = %record.address,
                    error = %e,
                    "Status fetch failed"
                );
                metrics::record_fetch_failure();
                let message = e.to_string();
                record.with_outcome(ProbeOutcome::Failed(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::InstancePhase;
    use crate::lifecycle::Shutdown;
    use crate::probe::{FetchError, ProbeFlags, RemoteStatus};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDiscovery {
        responses: Mutex<Vec<Result<Vec<InstanceDescriptor>, String>>>,
    }

    impl FakeDiscovery {
        fn push(&self, response: Result<Vec<InstanceDescriptor>, String>) {
            self.responses.lock().unwrap().push(response);
        }
    }

    #[async_trait]
    impl Discovery for FakeDiscovery {
        async fn list(&self, _: &LabelSelector) -> Result<Vec<InstanceDescriptor>, DiscoveryError> {
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses.first().cloned().unwrap_or_else(|| Ok(Vec::new()))
            };
            next.map_err(DiscoveryError::Request)
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        responses: HashMap<String, Result<RemoteStatus, FetchError>>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StatusFetcher for FakeFetcher {
        async fn fetch_status(&self, address: &str) -> Result<RemoteStatus, FetchError> {
            self.calls.lock().unwrap().push(address.to_string());
            self.responses
                .get(address)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Connect("connection refused".into())))
        }
    }

    fn pod(name: &str, phase: &str, address: &str) -> InstanceDescriptor {
        InstanceDescriptor {
            name: name.to_string(),
            namespace: "default".to_string(),
            address: address.to_string(),
            host: "node-1".to_string(),
            phase: phase.into(),
        }
    }

    fn status(ready: bool) -> RemoteStatus {
        RemoteStatus {
            probe_status: ProbeFlags { started: true, live: true, ready },
            ..RemoteStatus::default()
        }
    }

    fn reconciler(discovery: Arc<FakeDiscovery>, fetcher: Arc<FakeFetcher>) -> (Reconciler, Arc<StateStore>) {
        let store = Arc::new(StateStore::new());
        let reconciler = Reconciler::new(
            discovery,
            fetcher,
            store.clone(),
            LabelSelector::parse("app=probe-demo").unwrap(),
            &ReconcilerConfig::default(),
        );
        (reconciler, store)
    }

    fn identities(store: &StateStore) -> Vec<String> {
        store.snapshot_map().into_keys().collect()
    }

    #[tokio::test]
    async fn test_running_instance_is_probed() {
        let discovery = Arc::new(FakeDiscovery::default());
        discovery.push(Ok(vec![pod("web-7f8c9d-abcde", "Running", "10.0.0.5")]));
        let fetcher = Arc::new(FakeFetcher {
            responses: [("10.0.0.5".to_string(), Ok(status(false)))].into_iter().collect(),
            ..FakeFetcher::default()
        });
        let (reconciler, store) = reconciler(discovery, fetcher);

        let report = reconciler.run_cycle().await.unwrap();
        assert_eq!(report.discovered, 1);
        assert_eq!(report.reported, 1);

        let record = store.get("web-7f8c9d-abcde").unwrap();
        assert_eq!(record.phase, InstancePhase::Running);
        assert_eq!(record.group_tag, "7f8c9d");
        assert!(!record.remote().unwrap().probe_status.ready);
        assert!(record.error().is_none());
    }

    #[tokio::test]
    async fn test_pending_instance_is_not_probed() {
        let discovery = Arc::new(FakeDiscovery::default());
        discovery.push(Ok(vec![pod("web-7f8c9d-pend1", "Pending", "")]));
        let fetcher = Arc::new(FakeFetcher::default());
        let (reconciler, store) = reconciler(discovery, fetcher.clone());

        reconciler.run_cycle().await.unwrap();

        assert!(fetcher.calls.lock().unwrap().is_empty());
        let record = store.get("web-7f8c9d-pend1").unwrap();
        assert!(record.remote().is_none());
        assert!(record.error().is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_isolated() {
        let discovery = Arc::new(FakeDiscovery::default());
        discovery.push(Ok(vec![
            pod("web-aaa-1", "Running", "10.0.0.1"),
            pod("web-aaa-2", "Running", "10.0.0.2"),
        ]));
        let fetcher = Arc::new(FakeFetcher {
            responses: [
                ("10.0.0.1".to_string(), Err(FetchError::Status(500))),
                ("10.0.0.2".to_string(), Ok(status(true))),
            ]
            .into_iter()
            .collect(),
            ..FakeFetcher::default()
        });
        let (reconciler, store) = reconciler(discovery, fetcher);

        let report = reconciler.run_cycle().await.unwrap();
        assert_eq!((report.reported, report.failed), (1, 1));

        let a = store.get("web-aaa-1").unwrap();
        assert_eq!(a.error(), Some("unexpected status code: 500"));
        assert!(a.remote().is_none());

        let b = store.get("web-aaa-2").unwrap();
        assert!(b.remote().unwrap().probe_status.ready);
        assert!(b.error().is_none());
    }

    #[tokio::test]
    async fn test_store_matches_latest_discovery() {
        let discovery = Arc::new(FakeDiscovery::default());
        discovery.push(Ok(vec![pod("a", "Pending", ""), pod("b", "Pending", ""), pod("c", "Pending", "")]));
        discovery.push(Ok(vec![pod("b", "Pending", ""), pod("d", "Pending", "")]));
        discovery.push(Ok(vec![]));
        let (reconciler, store) = reconciler(discovery, Arc::new(FakeFetcher::default()));

        reconciler.run_cycle().await.unwrap();
        assert_eq!(identities(&store), vec!["a", "b", "c"]);

        let report = reconciler.run_cycle().await.unwrap();
        assert_eq!(report.pruned, 2);
        assert_eq!(identities(&store), vec!["b", "d"]);

        reconciler.run_cycle().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_failure_leaves_store_untouched() {
        let discovery = Arc::new(FakeDiscovery::default());
        discovery.push(Ok(vec![pod("a", "Pending", "")]));
        discovery.push(Err("apiserver unavailable".to_string()));
        let (reconciler, store) = reconciler(discovery, Arc::new(FakeFetcher::default()));

        reconciler.run_cycle().await.unwrap();
        let before = store.snapshot();

        let err = reconciler.run_cycle().await.unwrap_err();
        assert!(err.to_string().contains("apiserver unavailable"));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_group_tag_policy_is_swappable() {
        let discovery = Arc::new(FakeDiscovery::default());
        discovery.push(Ok(vec![pod("web-7f8c9d-abcde", "Pending", "")]));
        let (reconciler, store) = reconciler(discovery, Arc::new(FakeFetcher::default()));
        let reconciler = reconciler.with_group_tag(|name| name.to_uppercase());

        reconciler.run_cycle().await.unwrap();
        assert_eq!(store.get("web-7f8c9d-abcde").unwrap().group_tag, "WEB-7F8C9D-ABCDE");
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let discovery = Arc::new(FakeDiscovery::default());
        discovery.push(Ok(vec![pod("a", "Pending", "")]));
        let (reconciler, store) = reconciler(discovery, Arc::new(FakeFetcher::default()));
        let reconciler = reconciler.with_interval(Duration::from_millis(20));
        let mut status = reconciler.subscribe();

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(reconciler.run(shutdown.subscribe()));

        tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| s.cycles >= 2))
            .await
            .expect("reconciler never cycled")
            .unwrap();
        assert_eq!(identities(&store), vec!["a"]);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("reconciler did not stop")
            .unwrap();
        assert_eq!(status.borrow().state, ReconcilerState::Stopped);
    }
}
