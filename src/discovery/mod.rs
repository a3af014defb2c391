//! Instance discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Reconciler tick
//!     → Discovery::list(selector)
//!         - kubernetes.rs (API server pod list, in-cluster or explicit URL)
//!         - fixed.rs (instances declared in config)
//!     → Vec<InstanceDescriptor>
//! ```
//!
//! # Design Decisions
//! - Discovery is queried, never cached; every cycle sees a fresh list
//! - Backends sit behind a trait object so the reconciler is backend-agnostic
//! - A failed list aborts the cycle; the next tick is the retry

pub mod fixed;
pub mod kubernetes;
pub mod selector;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fixed::StaticDiscovery;
pub use kubernetes::KubernetesDiscovery;
pub use selector::{LabelSelector, SelectorError};

/// Lifecycle phase of an instance as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstancePhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
    /// Any phase string this crate does not know about.
    Other(String),
}

impl InstancePhase {
    pub fn as_str(&self) -> &str {
        match self {
            InstancePhase::Pending => "Pending",
            InstancePhase::Running => "Running",
            InstancePhase::Succeeded => "Succeeded",
            InstancePhase::Failed => "Failed",
            InstancePhase::Unknown => "Unknown",
            InstancePhase::Other(s) => s,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, InstancePhase::Running)
    }
}

impl From<String> for InstancePhase {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Pending" => InstancePhase::Pending,
            "Running" => InstancePhase::Running,
            "Succeeded" => InstancePhase::Succeeded,
            "Failed" => InstancePhase::Failed,
            "Unknown" | "" => InstancePhase::Unknown,
            _ => InstancePhase::Other(s),
        }
    }
}

impl From<&str> for InstancePhase {
    fn from(s: &str) -> Self {
        InstancePhase::from(s.to_string())
    }
}

impl From<InstancePhase> for String {
    fn from(phase: InstancePhase) -> Self {
        match phase {
            InstancePhase::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for InstancePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instance as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDescriptor {
    /// Identity, unique within the queried scope.
    pub name: String,
    /// Namespace the instance lives in, empty when not applicable.
    pub namespace: String,
    /// Network address (IP, or `host:port`). Empty until assigned.
    pub address: String,
    /// Host (node) assignment.
    pub host: String,
    pub phase: InstancePhase,
}

/// Errors that can occur while listing instances.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No usable cluster configuration.
    #[error("discovery configuration error: {0}")]
    Config(String),

    /// The request could not be sent or completed.
    #[error("failed to reach cluster API: {0}")]
    Request(String),

    /// Credentials were rejected.
    #[error("cluster API rejected credentials (status {0})")]
    Unauthorized(u16),

    /// Any other non-success status.
    #[error("cluster API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The list response could not be decoded.
    #[error("failed to decode instance list: {0}")]
    Decode(String),
}

/// A source of instance descriptors.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// List every instance matching `selector`.
    async fn list(&self, selector: &LabelSelector) -> Result<Vec<InstanceDescriptor>, DiscoveryError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_round_trip() {
        assert_eq!(InstancePhase::from("Running"), InstancePhase::Running);
        assert_eq!(InstancePhase::from(""), InstancePhase::Unknown);
        assert_eq!(
            InstancePhase::from("Terminating"),
            InstancePhase::Other("Terminating".to_string())
        );
        assert_eq!(String::from(InstancePhase::Other("Evicted".into())), "Evicted");
        assert!(InstancePhase::Running.is_running());
        assert!(!InstancePhase::Pending.is_running());
    }

    #[test]
    fn test_phase_serializes_as_string() {
        let json = serde_json::to_string(&InstancePhase::Pending).unwrap();
        assert_eq!(json, "\"Pending\"");
        let phase: InstancePhase = serde_json::from_str("\"Succeeded\"").unwrap();
        assert_eq!(phase, InstancePhase::Succeeded);
    }
}
