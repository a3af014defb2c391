//! Same-origin relay for probe toggle actions.
//!
//! # Design Decisions
//! - With `restrict_targets`, only the probe endpoint (`host:port`) of a
//!   monitored instance is reachable, and only under `/api/probes/`
//! - Redirects are relayed to the caller, never followed

use axum::body::Body;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::ForwarderConfig;
use crate::observability::metrics;
use crate::probe::{ProbeClient, RelayError, RelayedResponse};
use crate::state::record::address_host;
use crate::state::SnapshotReader;

const PROBE_ACTION_PREFIX: &str = "/api/probes/";

/// Caller-supplied action: where to send it and with which method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActionRequest {
    pub url: String,
    /// Empty means GET.
    #[serde(default)]
    pub method: String,
}

/// Why an action was not relayed, or failed while being relayed.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Invalid request body")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),

    #[error("Target is not a monitored pod: {0}")]
    UnknownTarget(String),

    #[error("Target is not a probe action: {0}")]
    NotProbeAction(String),

    #[error("Failed to call pod API: {0}")]
    Relay(#[from] RelayError),
}

impl ForwardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForwardError::InvalidBody(_)
            | ForwardError::InvalidMethod(_)
            | ForwardError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ForwardError::UnknownTarget(_) | ForwardError::NotProbeAction(_) => {
                StatusCode::FORBIDDEN
            }
            ForwardError::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

impl IntoResponse for RelayedResponse {
    fn into_response(self) -> Response {
        let mut builder = Response::builder().status(self.status);
        if let Some(content_type) = &self.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder
            .body(Body::from(self.body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// Relays actions from the dashboard to instance endpoints.
#[derive(Debug, Clone)]
pub struct ActionForwarder {
    client: ProbeClient,
    snapshot: SnapshotReader,
    restrict_targets: bool,
}

impl ActionForwarder {
    pub fn new(client: ProbeClient, snapshot: SnapshotReader, config: &ForwarderConfig) -> Self {
        Self {
            client,
            snapshot,
            restrict_targets: config.restrict_targets,
        }
    }

    /// Decode a raw request body.
    pub fn decode(body: &[u8]) -> Result<ActionRequest, ForwardError> {
        serde_json::from_slice(body).map_err(ForwardError::InvalidBody)
    }

    /// Validate the request and turn it into a relay target.
    pub fn resolve(&self, request: &ActionRequest) -> Result<(Url, Method), ForwardError> {
        let method = parse_method(&request.method)?;

        let url = Url::parse(request.url.trim())
            .map_err(|e| ForwardError::InvalidTarget(format!("{}: {e}", request.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ForwardError::InvalidTarget(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .map(address_host)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ForwardError::InvalidTarget(format!("{}: missing host", request.url)))?;

        if self.restrict_targets {
            let port = url
                .port_or_known_default()
                .ok_or_else(|| ForwardError::InvalidTarget(format!("{}: missing port", request.url)))?;
            if !self.snapshot.is_monitored_endpoint(host, port, self.client.port()) {
                return Err(ForwardError::UnknownTarget(format!("{host}:{port}")));
            }
            // Url::parse has already collapsed dot segments.
            if !url.path().starts_with(PROBE_ACTION_PREFIX) {
                return Err(ForwardError::NotProbeAction(url.path().to_string()));
            }
        }

        Ok((url, method))
    }

    /// Decode, validate and relay one action, returning the remote response as is.
    pub async fn handle_action(&self, body: &[u8]) -> Result<RelayedResponse, ForwardError> {
        let outcome = self.relay(body).await;
        match &outcome {
            Ok(_) => metrics::record_relay("ok"),
            Err(ForwardError::Relay(_)) => metrics::record_relay("error"),
            Err(_) => metrics::record_relay("rejected"),
        }
        outcome
    }

    async fn relay(&self, body: &[u8]) -> Result<RelayedResponse, ForwardError> {
        let request = Self::decode(body)?;
        let (url, method) = self.resolve(&request).inspect_err(|e| {
            tracing::warn!(url = %request.url, method = %request.method, error = %e, "Rejected action");
        })?;

        match self.client.forward(url.clone(), method.clone()).await {
            Ok(relayed) => {
                tracing::info!(
                    url = %url,
                    method = %method,
                    status = relayed.status.as_u16(),
                    "Relayed action"
                );
                Ok(relayed)
            }
            Err(e) => {
                tracing::error!(url = %url, method = %method, error = %e, "Action relay failed");
                Err(e.into())
            }
        }
    }
}

fn parse_method(raw: &str) -> Result<Method, ForwardError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| ForwardError::InvalidMethod(raw.to_string()))
}
