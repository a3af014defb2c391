//! Wire types for an instance's probe API.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three independent probe flags an instance reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeFlags {
    pub started: bool,
    pub live: bool,
    pub ready: bool,
}

/// Status document served by an instance at its info path.
///
/// Treated as opaque beyond structural decoding: missing fields decode to
/// their zero values, unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteStatus {
    pub pod_name: String,
    #[serde(rename = "podIP")]
    pub pod_ip: String,
    pub node_hostname: String,
    /// Time since the container started, in nanoseconds.
    pub container_age: i64,
    /// Container start time (RFC 3339).
    pub start_time: String,
    pub probe_status: ProbeFlags,
    /// Configured startup delay in seconds.
    pub startup_delay: i64,
    pub startup_ready: String,
}

impl RemoteStatus {
    /// Container age as a duration; negative values clamp to zero.
    pub fn age(&self) -> Duration {
        Duration::from_nanos(self.container_age.max(0) as u64)
    }

    /// Parsed start time, if the instance reported a valid RFC 3339 timestamp.
    pub fn started_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.start_time).ok()
    }
}

/// A probe an instance lets callers toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Startup,
    Liveness,
    Readiness,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 3] = [ProbeKind::Startup, ProbeKind::Liveness, ProbeKind::Readiness];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Startup => "startup",
            ProbeKind::Liveness => "liveness",
            ProbeKind::Readiness => "readiness",
        }
    }

    /// The flag this probe drives in `ProbeFlags`.
    pub fn flag(&self, flags: &ProbeFlags) -> bool {
        match self {
            ProbeKind::Startup => flags.started,
            ProbeKind::Liveness => flags.live,
            ProbeKind::Readiness => flags.ready,
        }
    }
}

/// What to do with a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeAction {
    Fail,
    Recover,
}

impl ProbeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeAction::Fail => "fail",
            ProbeAction::Recover => "recover",
        }
    }

    /// The action that flips a probe currently at `passing`.
    pub fn toggle(passing: bool) -> Self {
        if passing {
            ProbeAction::Fail
        } else {
            ProbeAction::Recover
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

impl FromStr for ProbeKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProbeKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl FromStr for ProbeAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(ProbeAction::Fail),
            "recover" => Ok(ProbeAction::Recover),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}
