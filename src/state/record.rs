//! Per-instance status record.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::discovery::{InstanceDescriptor, InstancePhase};
use crate::probe::RemoteStatus;

/// Result of probing an instance during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProbeOutcome {
    /// Not running or no address yet; nothing was fetched.
    #[default]
    NotProbed,
    /// The instance answered with a well-formed status document.
    Reported(RemoteStatus),
    /// The fetch failed; holds the error description.
    Failed(String),
}

/// Last known state of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub name: String,
    pub namespace: String,
    pub address: String,
    pub host: String,
    pub phase: InstancePhase,
    pub group_tag: String,
    pub outcome: ProbeOutcome,
    pub last_checked: DateTime<Utc>,
}

impl StatusRecord {
    /// A record for `descriptor` observed at `at`, not yet probed.
    pub fn observed(descriptor: &InstanceDescriptor, group_tag: String, at: DateTime<Utc>) -> Self {
        Self {
            name: descriptor.name.clone(),
            namespace: descriptor.namespace.clone(),
            address: descriptor.address.clone(),
            host: descriptor.host.clone(),
            phase: descriptor.phase.clone(),
            group_tag,
            outcome: ProbeOutcome::NotProbed,
            last_checked: at,
        }
    }

    /// Whether this instance is eligible for a status fetch.
    pub fn should_probe(&self) -> bool {
        self.phase.is_running() && !self.address.is_empty()
    }

    pub fn with_outcome(mut self, outcome: ProbeOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn remote(&self) -> Option<&RemoteStatus> {
        match &self.outcome {
            ProbeOutcome::Reported(status) => Some(status),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ProbeOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Host part of the address, without any port or IPv6 brackets.
    pub fn address_host(&self) -> &str {
        address_host(&self.address)
    }

    /// Port carried by the address itself, if any.
    pub fn address_port(&self) -> Option<u16> {
        address_port(&self.address)
    }
}

/// Strip an optional port and IPv6 brackets from an instance address.
pub fn address_host(address: &str) -> &str {
    if let Some(rest) = address.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match address.rsplit_once(':') {
        // More than one colon without brackets is a bare IPv6 address.
        Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => host,
        _ => address,
    }
}

/// Explicit port of an instance address (`host:port` or `[v6]:port`).
pub fn address_port(address: &str) -> Option<u16> {
    if let Some(rest) = address.strip_prefix('[') {
        return rest.split_once("]:").and_then(|(_, port)| port.parse().ok());
    }
    match address.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => port.parse().ok(),
        _ => None,
    }
}

#[derive(Serialize)]
struct RecordWire<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Namespace", skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
    #[serde(rename = "IP")]
    address: &'a str,
    #[serde(rename = "Node")]
    host: &'a str,
    #[serde(rename = "Status")]
    phase: &'a str,
    #[serde(rename = "Info")]
    remote: Option<&'a RemoteStatus>,
    #[serde(rename = "Error")]
    error: Option<&'a str>,
    #[serde(rename = "LastCheck")]
    last_checked: &'a DateTime<Utc>,
    #[serde(rename = "ReplicaSetID")]
    group_tag: &'a str,
}

impl Serialize for StatusRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RecordWire {
            name: &self.name,
            namespace: &self.namespace,
            address: &self.address,
            host: &self.host,
            phase: self.phase.as_str(),
            remote: self.remote(),
            error: self.error(),
            last_checked: &self.last_checked,
            group_tag: &self.group_tag,
        }
        .serialize(serializer)
    }
}
