//! Kubernetes pod probe dashboard library.

pub mod config;
pub mod dashboard;
pub mod discovery;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod reconcile;
pub mod state;
pub mod version;

pub use config::schema::MonitorConfig;
pub use http::HttpServer;
pub use lifecycle::{Monitor, Shutdown};
pub use state::{SnapshotReader, StateStore};
