//! Kubernetes API discovery backend.
//!
//! # Responsibilities
//! - Resolve the API server (explicit URL or in-cluster service account)
//! - List pods matching the selector, cluster-wide or in one namespace
//! - Map pod name/IP/node/phase into `InstanceDescriptor`s
//!
//! # Design Decisions
//! - Plain REST over reqwest; only the pod list endpoint is needed
//! - The bearer token is read on every call so rotated tokens are picked up
//! - The list call has its own timeout, independent of probe timeouts

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::DiscoveryConfig;
use crate::discovery::{Discovery, DiscoveryError, InstanceDescriptor, LabelSelector};

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: PodMeta,
    #[serde(default)]
    spec: PodSpec,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Debug, Deserialize)]
struct PodMeta {
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    #[serde(default)]
    node_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PodStatus {
    #[serde(default)]
    phase: String,
    #[serde(rename = "podIP", default)]
    pod_ip: String,
}

impl From<Pod> for InstanceDescriptor {
    fn from(pod: Pod) -> Self {
        InstanceDescriptor {
            name: pod.metadata.name,
            namespace: pod.metadata.namespace,
            address: pod.status.pod_ip,
            host: pod.spec.node_name,
            phase: pod.status.phase.into(),
        }
    }
}

/// Lists pods through the Kubernetes API server.
#[derive(Debug, Clone)]
pub struct KubernetesDiscovery {
    client: reqwest::Client,
    pods_url: Url,
    token_path: Option<PathBuf>,
}

impl KubernetesDiscovery {
    /// Build from configuration, falling back to the in-cluster service account.
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, DiscoveryError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    fn resolve<F>(config: &DiscoveryConfig, env: F) -> Result<Self, DiscoveryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_account = Path::new(SERVICE_ACCOUNT_DIR);
        let (api_server, default_token, default_ca) = match &config.api_server {
            Some(url) => (url.clone(), None, None),
            None => {
                let host = env("KUBERNETES_SERVICE_HOST").ok_or_else(|| {
                    DiscoveryError::Config(
                        "not running in a cluster and discovery.api_server is unset".to_string(),
                    )
                })?;
                let port = env("KUBERNETES_SERVICE_PORT").unwrap_or_else(|| "443".to_string());
                let host = if host.contains(':') { format!("[{host}]") } else { host };
                (
                    format!("https://{host}:{port}"),
                    Some(service_account.join("token")),
                    Some(service_account.join("ca.crt")),
                )
            }
        };

        let api_server = Url::parse(&api_server)
            .map_err(|e| DiscoveryError::Config(format!("invalid API server URL '{api_server}': {e}")))?;
        let pods_url = pods_url(&api_server, config.namespace.as_deref())?;
        let token_path = config.token_path.as_ref().map(PathBuf::from).or(default_token);
        let ca_path = config.ca_path.as_ref().map(PathBuf::from).or(default_ca);

        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(ca_path) = ca_path {
            let pem = std::fs::read(&ca_path).map_err(|e| {
                DiscoveryError::Config(format!("failed to read CA bundle {}: {e}", ca_path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| DiscoveryError::Config(format!("invalid CA bundle: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| DiscoveryError::Config(format!("failed to build HTTP client: {e}")))?;

        tracing::info!(
            pods_url = %pods_url,
            authenticated = token_path.is_some(),
            "Kubernetes discovery configured"
        );

        Ok(Self {
            client,
            pods_url,
            token_path,
        })
    }

    async fn bearer_token(&self) -> Result<Option<String>, DiscoveryError> {
        let Some(path) = &self.token_path else {
            return Ok(None);
        };
        let token = tokio::fs::read_to_string(path).await.map_err(|e| {
            DiscoveryError::Config(format!("failed to read token {}: {e}", path.display()))
        })?;
        Ok(Some(token.trim().to_string()))
    }
}

fn pods_url(api_server: &Url, namespace: Option<&str>) -> Result<Url, DiscoveryError> {
    let mut base = api_server.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let path = match namespace {
        Some(ns) => format!("api/v1/namespaces/{ns}/pods"),
        None => "api/v1/pods".to_string(),
    };
    base.join(&path)
        .map_err(|e| DiscoveryError::Config(format!("invalid pods URL: {e}")))
}

#[async_trait]
impl Discovery for KubernetesDiscovery {
    async fn list(&self, selector: &LabelSelector) -> Result<Vec<InstanceDescriptor>, DiscoveryError> {
        let mut request = self
            .client
            .get(self.pods_url.clone())
            .query(&[("labelSelector", selector.to_string())]);
        if let Some(token) = self.bearer_token().await? {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DiscoveryError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DiscoveryError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_utf8(&mut body, MAX_ERROR_BODY);
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DiscoveryError::Request(e.to_string()))?;
        let list: PodList =
            serde_json::from_slice(&bytes).map_err(|e| DiscoveryError::Decode(e.to_string()))?;

        Ok(list.items.into_iter().map(InstanceDescriptor::from).collect())
    }

    fn name(&self) -> &'static str {
        "kubernetes"
    }
}

fn truncate_utf8(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let cut = (0..=max).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0);
    s.truncate(cut);
}
