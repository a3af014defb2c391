//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;

use pod_monitor::config::{DiscoveryMode, MonitorConfig, StaticInstanceConfig};
use pod_monitor::lifecycle::{Monitor, Shutdown};
use pod_monitor::probe::{ProbeFlags, RemoteStatus};
use pod_monitor::state::StateStore;

/// A fake pod: serves `/api/info` and flips its flags on `/api/probes/{probe}/{action}`.
#[derive(Clone)]
pub struct MockInstance {
    pub addr: SocketAddr,
    pub flags: Arc<Mutex<ProbeFlags>>,
    pub actions: Arc<Mutex<Vec<String>>>,
}

impl MockInstance {
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn flags(&self) -> ProbeFlags {
        *self.flags.lock().unwrap()
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

/// Start a mock instance with the given probe flags on an ephemeral port.
pub async fn start_mock_instance(flags: ProbeFlags) -> MockInstance {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let instance = MockInstance {
        addr: listener.local_addr().unwrap(),
        flags: Arc::new(Mutex::new(flags)),
        actions: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/api/info", get(info))
        .route("/api/probes/{probe}/{action}", post(toggle))
        .with_state(instance.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    instance
}

async fn info(State(instance): State<MockInstance>) -> Json<RemoteStatus> {
    Json(RemoteStatus {
        pod_name: "mock".to_string(),
        pod_ip: instance.addr.ip().to_string(),
        node_hostname: "node-1".to_string(),
        container_age: 42_000_000_000,
        start_time: "2026-10-18T09:00:00Z".to_string(),
        probe_status: instance.flags(),
        startup_delay: 5,
        startup_ready: "true".to_string(),
    })
}

async fn toggle(
    State(instance): State<MockInstance>,
    Path((probe, action)): Path<(String, String)>,
) -> (StatusCode, String) {
    let value = match action.as_str() {
        "fail" => false,
        "recover" => true,
        _ => return (StatusCode::BAD_REQUEST, format!("unknown action {action}")),
    };
    {
        let mut flags = instance.flags.lock().unwrap();
        match probe.as_str() {
            "startup" => flags.started = value,
            "liveness" => flags.live = value,
            "readiness" => flags.ready = value,
            _ => return (StatusCode::NOT_FOUND, format!("unknown probe {probe}")),
        }
    }
    instance.actions.lock().unwrap().push(format!("{probe}/{action}"));
    (StatusCode::OK, format!("{probe} probe set to {action}"))
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn instance(name: &str, address: &str, phase: &str) -> StaticInstanceConfig {
    StaticInstanceConfig {
        name: name.to_string(),
        address: address.to_string(),
        host: "node-1".to_string(),
        phase: phase.to_string(),
        labels: BTreeMap::from([("app".to_string(), "probe-demo".to_string())]),
    }
}

/// Static-discovery config with a one second cycle.
pub fn static_config(instances: Vec<StaticInstanceConfig>) -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.discovery.mode = DiscoveryMode::Static;
    config.discovery.instances = instances;
    config.reconciler.interval_secs = 1;
    config.probe.timeout_secs = 1;
    config
}

pub struct RunningMonitor {
    pub addr: SocketAddr,
    pub store: Arc<StateStore>,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl RunningMonitor {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Build and serve a monitor on an ephemeral port.
pub async fn start_monitor(config: MonitorConfig) -> RunningMonitor {
    let monitor = Monitor::build(&config).unwrap();
    let store = monitor.store();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let serve_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move { monitor.serve(listener, &serve_shutdown).await });

    RunningMonitor {
        addr,
        store,
        shutdown,
        handle,
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Poll `/api/pods` until `done` holds, or panic after ten seconds.
pub async fn wait_for_pods<F>(client: &reqwest::Client, monitor: &RunningMonitor, done: F) -> Value
where
    F: Fn(&Value) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(res) = client.get(monitor.url("/api/pods")).send().await {
            if let Ok(pods) = res.json::<Value>().await {
                if done(&pods) {
                    return pods;
                }
            }
        }
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for /api/pods");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
