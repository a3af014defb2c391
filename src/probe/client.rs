//! Remote probe client.
//!
//! # Responsibilities
//! - Fetch an instance's status document at the well-known port and path
//! - Relay a caller-supplied request to an instance and hand back the raw response
//!
//! # Design Decisions
//! - One shared reqwest client; every call is bounded by the same short timeout
//! - No retries: a failed fetch is reported once and retried by the next cycle
//! - Environment proxies are ignored; instance addresses are cluster-private

use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{Method, StatusCode};
use thiserror::Error;
use url::Url;

use crate::config::ProbeConfig;
use crate::probe::types::{ProbeAction, ProbeKind, RemoteStatus};

/// A failed status fetch for one instance.
///
/// The `Display` form is what ends up in a record's error field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("failed to read response: {0}")]
    Read(String),

    #[error("failed to parse JSON: {0}")]
    Decode(String),
}

/// A failed relay of a forwarded action.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Send(String),

    #[error("failed to read response: {0}")]
    Read(String),
}

/// A relayed response, passed back to the caller unmodified.
#[derive(Debug, Clone)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Source of remote status documents.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_status(&self, address: &str) -> Result<RemoteStatus, FetchError>;
}

/// HTTP client for instance probe endpoints.
#[derive(Debug, Clone)]
pub struct ProbeClient {
    client: reqwest::Client,
    port: u16,
    info_path: String,
    timeout: Duration,
}

impl ProbeClient {
    pub fn new(config: &ProbeConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .user_agent(concat!("pod-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            port: config.port,
            info_path: config.info_path.clone(),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Port used for addresses that do not carry one.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` for an instance address. An address that already carries
    /// a port is used as is.
    pub fn authority(&self, address: &str) -> String {
        if address.parse::<SocketAddr>().is_ok() {
            return address.to_string();
        }
        match address.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, self.port),
            _ if address.rsplit_once(':').is_some_and(|(_, p)| p.parse::<u16>().is_ok()) => {
                address.to_string()
            }
            _ => format!("{}:{}", address, self.port),
        }
    }

    pub fn status_url(&self, address: &str) -> String {
        format!("http://{}{}", self.authority(address), self.info_path)
    }

    /// URL of the toggle endpoint for one probe on one instance.
    pub fn action_url(&self, address: &str, kind: ProbeKind, action: ProbeAction) -> String {
        format!(
            "http://{}/api/probes/{}/{}",
            self.authority(address),
            kind.as_str(),
            action.as_str()
        )
    }

    /// Send `method` to `url` and return the remote status and body verbatim.
    pub async fn forward(&self, url: Url, method: Method) -> Result<RelayedResponse, RelayError> {
        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::Timeout(self.timeout)
                } else {
                    RelayError::Send(error_chain(&e))
                }
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::Timeout(self.timeout)
            } else {
                RelayError::Read(error_chain(&e))
            }
        })?;

        Ok(RelayedResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl StatusFetcher for ProbeClient {
    async fn fetch_status(&self, address: &str) -> Result<RemoteStatus, FetchError> {
        let response = self
            .client
            .get(self.status_url(address))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.timeout)
                } else {
                    FetchError::Connect(error_chain(&e))
                }
            })?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Read(error_chain(&e))
            }
        })?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Render an error with its source chain, e.g. "error sending request: connection refused".
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::Router;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    fn client_for(port: u16, timeout_secs: u64) -> ProbeClient {
        ProbeClient::new(&ProbeConfig {
            port,
            timeout_secs,
            ..ProbeConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_authority() {
        let client = client_for(8080, 3);
        assert_eq!(client.authority("10.0.0.5"), "10.0.0.5:8080");
        assert_eq!(client.authority("10.0.0.5:9000"), "10.0.0.5:9000");
        assert_eq!(client.authority("fd00::5"), "[fd00::5]:8080");
        assert_eq!(client.authority("[fd00::5]:9000"), "[fd00::5]:9000");
        assert_eq!(client.authority("pod.local"), "pod.local:8080");
        assert_eq!(client.status_url("10.0.0.5"), "http://10.0.0.5:8080/api/info");
        assert_eq!(
            client.action_url("10.0.0.5", ProbeKind::Readiness, ProbeAction::Fail),
            "http://10.0.0.5:8080/api/probes/readiness/fail"
        );
    }

    #[tokio::test]
    async fn test_fetch_status_decodes() {
        let app = Router::new().route(
            "/api/info",
            get(|| async {
                (
                    [("content-type", "application/json")],
                    r#"{"probeStatus":{"started":true,"live":true,"ready":false}}"#,
                )
            }),
        );
        let addr = serve(app).await;
        let client = client_for(addr.port(), 3);

        let status = client.fetch_status("127.0.0.1").await.unwrap();
        assert!(status.probe_status.started);
        assert!(status.probe_status.live);
        assert!(!status.probe_status.ready);
    }

    #[tokio::test]
    async fn test_fetch_status_errors() {
        let app = Router::new()
            .route("/api/info", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "starting") }));
        let addr = serve(app).await;
        let err = client_for(addr.port(), 3).fetch_status("127.0.0.1").await.unwrap_err();
        assert_eq!(err, FetchError::Status(503));
        assert_eq!(err.to_string(), "unexpected status code: 503");

        let app = Router::new().route("/api/info", get(|| async { "<html>not json</html>" }));
        let addr = serve(app).await;
        let err = client_for(addr.port(), 3).fetch_status("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));

        let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = closed.local_addr().unwrap().port();
        drop(closed);
        let err = client_for(port, 3).fetch_status("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, FetchError::Connect(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_status_times_out() {
        let app = Router::new().route(
            "/api/info",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
        let addr = serve(app).await;
        let started = std::time::Instant::now();
        let err = client_for(addr.port(), 1).fetch_status("127.0.0.1").await.unwrap_err();
        assert_eq!(err, FetchError::Timeout(Duration::from_secs(1)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_forward_passes_response_through() {
        let app = Router::new()
            .route("/api/probes/readiness/fail", post(|| async { "readiness probe will now fail" }))
            .route("/api/probes/bogus/fail", post(|| async { (StatusCode::NOT_FOUND, "no such probe") }));
        let addr = serve(app).await;
        let client = client_for(addr.port(), 3);

        let url = Url::parse(&format!("http://{addr}/api/probes/readiness/fail")).unwrap();
        let relayed = client.forward(url, Method::POST).await.unwrap();
        assert_eq!(relayed.status, StatusCode::OK);
        assert_eq!(&relayed.body[..], b"readiness probe will now fail");

        let url = Url::parse(&format!("http://{addr}/api/probes/bogus/fail")).unwrap();
        let relayed = client.forward(url, Method::POST).await.unwrap();
        assert_eq!(relayed.status, StatusCode::NOT_FOUND);
        assert_eq!(&relayed.body[..], b"no such probe");
    }

    #[tokio::test]
    async fn test_redirects_are_not_followed() {
        let secret = serve(Router::new().route("/secret", get(|| async { "metadata" }))).await;
        let location = format!("http://{secret}/secret");
        let app = Router::new().route(
            "/api/info",
            get(move || {
                let location = location.clone();
                async move { (StatusCode::FOUND, [("location", location)], "moved") }
            }),
        );
        let addr = serve(app).await;
        let client = client_for(addr.port(), 3);

        let err = client.fetch_status("127.0.0.1").await.unwrap_err();
        assert_eq!(err, FetchError::Status(302));

        let url = Url::parse(&format!("http://{addr}/api/info")).unwrap();
        let relayed = client.forward(url, Method::GET).await.unwrap();
        assert_eq!(relayed.status, StatusCode::FOUND);
        assert_eq!(&relayed.body[..], b"moved");
    }
}
