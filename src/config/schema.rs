//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor.
//! All types derive Serde traits for deserialization from config files, and
//! every section falls back to its defaults so an empty file is valid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the pod monitor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// Dashboard listener settings.
    pub server: ServerConfig,

    /// Where instances come from.
    pub discovery: DiscoveryConfig,

    /// Reconciliation loop settings.
    pub reconciler: ReconcilerConfig,

    /// Remote probe endpoint settings.
    pub probe: ProbeConfig,

    /// Action forwarding settings.
    pub forwarder: ForwarderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address without the port (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Listen port. Overridden by the `PORT` environment variable.
    pub port: u16,

    /// Upper bound on the time spent serving one inbound request.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// The `host:port` string handed to the TCP listener.
    pub fn listen_address(&self) -> String {
        if self.bind_address.contains(':') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8090,
            request_timeout_secs: 10,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Discovery backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Query the Kubernetes API server.
    #[default]
    Kubernetes,
    /// Use the instances declared in this file.
    Static,
}

/// Discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub mode: DiscoveryMode,

    /// Label selector identifying the monitored instances.
    pub label_selector: String,

    /// Namespace to list. `None` lists across all namespaces.
    pub namespace: Option<String>,

    /// Explicit API server URL (e.g. "http://127.0.0.1:8001" behind `kubectl proxy`).
    /// When unset the in-cluster service account is used.
    pub api_server: Option<String>,

    /// Bearer token file override.
    pub token_path: Option<String>,

    /// CA bundle override (PEM).
    pub ca_path: Option<String>,

    /// Timeout for a single list call in seconds.
    pub timeout_secs: u64,

    /// Instances for the static backend.
    pub instances: Vec<StaticInstanceConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::Kubernetes,
            label_selector: "app=probe-demo".to_string(),
            namespace: None,
            api_server: None,
            token_path: None,
            ca_path: None,
            timeout_secs: 5,
            instances: Vec::new(),
        }
    }
}

/// One statically declared instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticInstanceConfig {
    /// Instance identity.
    pub name: String,

    /// IP or `host:port` of the instance. Empty means not yet scheduled.
    #[serde(default)]
    pub address: String,

    /// Host (node) the instance runs on.
    #[serde(default)]
    pub host: String,

    /// Lifecycle phase as reported by the cluster.
    #[serde(default = "default_phase")]
    pub phase: String,

    /// Labels matched against `label_selector`.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

fn default_phase() -> String {
    "Running".to_string()
}

/// Reconciler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Seconds between two cycles.
    pub interval_secs: u64,

    /// Upper bound on in-flight status fetches within a cycle.
    pub max_concurrent_fetches: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_concurrent_fetches: 8,
        }
    }
}

/// Remote probe endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Port the instances expose their status API on.
    pub port: u16,

    /// Path of the status document.
    pub info_path: String,

    /// Timeout for fetches and forwarded actions in seconds.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            info_path: "/api/info".to_string(),
            timeout_secs: 3,
        }
    }
}

/// Action forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Only relay to hosts that belong to a currently monitored instance.
    pub restrict_targets: bool,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            restrict_targets: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,

    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Address of the metrics listener.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
