//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the discovery backend, probe client and store from config
//! - Start the reconciler task and the HTTP server
//! - Install signal handlers and wait for shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, once every subsystem is constructed
//! - The server stops accepting before the reconciler is awaited

use std::io;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{DiscoveryConfig, DiscoveryMode, MonitorConfig};
use crate::discovery::{
    Discovery, DiscoveryError, KubernetesDiscovery, LabelSelector, SelectorError, StaticDiscovery,
};
use crate::forward::ActionForwarder;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::metrics;
use crate::probe::{ProbeClient, StatusFetcher};
use crate::reconcile::Reconciler;
use crate::state::{SnapshotReader, StateStore};
use crate::version;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid label selector: {0}")]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] io::Error),
}

/// Pick the discovery backend named by the config.
pub fn build_discovery(config: &DiscoveryConfig) -> Result<Arc<dyn Discovery>, StartupError> {
    let discovery: Arc<dyn Discovery> = match config.mode {
        DiscoveryMode::Kubernetes => Arc::new(KubernetesDiscovery::from_config(config)?),
        DiscoveryMode::Static => Arc::new(StaticDiscovery::from_config(&config.instances)),
    };
    Ok(discovery)
}

/// A fully wired monitor: store, reconciler and server, not yet running.
pub struct Monitor {
    store: Arc<StateStore>,
    reconciler: Reconciler,
    server: HttpServer,
}

impl Monitor {
    /// Wire the monitor with the backends named in `config`.
    pub fn build(config: &MonitorConfig) -> Result<Self, StartupError> {
        let discovery = build_discovery(&config.discovery)?;
        let client = ProbeClient::new(&config.probe)?;
        Self::with_backends(config, discovery, Arc::new(client.clone()), client)
    }

    /// Wire the monitor around explicit discovery and fetch backends.
    pub fn with_backends(
        config: &MonitorConfig,
        discovery: Arc<dyn Discovery>,
        fetcher: Arc<dyn StatusFetcher>,
        client: ProbeClient,
    ) -> Result<Self, StartupError> {
        let selector = LabelSelector::parse(&config.discovery.label_selector)?;
        let store = Arc::new(StateStore::new());
        let snapshot = SnapshotReader::new(store.clone());

        let reconciler = Reconciler::new(
            discovery,
            fetcher,
            store.clone(),
            selector.clone(),
            &config.reconciler,
        );

        let state = AppState {
            forwarder: ActionForwarder::new(client.clone(), snapshot.clone(), &config.forwarder),
            snapshot,
            probe_client: client,
            selector: selector.to_string(),
            reconciler: reconciler.subscribe(),
        };
        let server = HttpServer::new(&config.server, state);

        Ok(Self {
            store,
            reconciler,
            server,
        })
    }

    pub fn store(&self) -> Arc<StateStore> {
        self.store.clone()
    }

    pub fn router(&self) -> Router {
        self.server.router()
    }

    /// Run the reconciler and serve on `listener` until `shutdown` fires.
    pub async fn serve(self, listener: TcpListener, shutdown: &Shutdown) -> io::Result<()> {
        let reconciler = tokio::spawn(self.reconciler.run(shutdown.subscribe()));

        let served = self.server.run(listener, shutdown.subscribe()).await;

        // The server may stop on its own (I/O error); make sure the loop follows.
        shutdown.trigger();
        tracing::debug!(pending = shutdown.receiver_count(), "Waiting for background tasks");
        if let Err(e) = reconciler.await {
            tracing::error!(error = %e, "Reconciler task failed");
        }
        tracing::debug!(pending = shutdown.receiver_count(), "Background tasks drained");
        served
    }
}

/// Start the monitor and block until it has shut down.
pub async fn run(config: MonitorConfig) -> Result<(), StartupError> {
    let build = version::build_info();
    tracing::info!(
        version = build.version,
        commit = build.commit,
        build_time = build.build_time,
        "pod-monitor starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let monitor = Monitor::build(&config)?;
    tracing::info!(
        discovery = ?config.discovery.mode,
        selector = %config.discovery.label_selector,
        interval_secs = config.reconciler.interval_secs,
        probe_port = config.probe.port,
        restrict_targets = config.forwarder.restrict_targets,
        "Configuration loaded"
    );

    let address = config.server.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    monitor.serve(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
