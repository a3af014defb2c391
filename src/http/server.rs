//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve on a listener until shutdown, then drain
//!
//! # Design Decisions
//! - Handlers only read the store; the reconciler is the sole writer
//! - `/api/proxy` accepts POST only; every other method gets a plain 405

use std::io;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::forward::ActionForwarder;
use crate::http::handlers;
use crate::http::request::{request_id, RequestUuid};
use crate::probe::ProbeClient;
use crate::reconcile::ReconcilerStatus;
use crate::state::SnapshotReader;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub snapshot: SnapshotReader,
    pub forwarder: ActionForwarder,
    pub probe_client: ProbeClient,
    /// Label selector, shown on the dashboard.
    pub selector: String,
    pub reconciler: watch::Receiver<ReconcilerStatus>,
}

/// HTTP server for the dashboard and its API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::dashboard))
            .route("/api/pods", get(handlers::list_pods))
            .route(
                "/api/proxy",
                post(handlers::proxy_action).fallback(handlers::method_not_allowed),
            )
            .route("/api/status", get(handlers::status))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(RequestUuid))
    }

    /// The fully layered router, for driving without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
