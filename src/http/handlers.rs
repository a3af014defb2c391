//! Route handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dashboard::render_dashboard;
use crate::http::server::AppState;
use crate::reconcile::ReconcilerStatus;
use crate::state::StatusRecord;
use crate::version::{self, BuildInfo};

/// `GET /`
pub async fn dashboard(State(state): State<AppState>) -> Html<String> {
    render_dashboard(&state.snapshot, &state.probe_client, &state.selector)
}

/// `GET /api/pods`: every record keyed by identity.
pub async fn list_pods(State(state): State<AppState>) -> Json<BTreeMap<String, StatusRecord>> {
    Json(state.snapshot.by_identity())
}

/// `POST /api/proxy`
pub async fn proxy_action(State(state): State<AppState>, body: Bytes) -> Response {
    match state.forwarder.handle_action(&body).await {
        Ok(relayed) => relayed.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Any other method on `/api/proxy`.
pub async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub build: BuildInfo,
    pub selector: String,
    pub instances: usize,
    pub reconciler: ReconcilerStatus,
}

/// `GET /api/status`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        build: version::build_info(),
        selector: state.selector.clone(),
        instances: state.snapshot.instance_count(),
        reconciler: state.reconciler.borrow().clone(),
    })
}
