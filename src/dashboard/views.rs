//! View types for the dashboard template.
//!
//! These carry pre-formatted strings so the template stays free of logic.

use std::time::Duration;

use crate::probe::{ProbeAction, ProbeClient, ProbeKind, RemoteStatus};
use crate::state::StatusRecord;

/// One probe indicator on a card.
pub struct ProbeView {
    pub kind: &'static str,
    pub label: &'static str,
    pub passing: bool,
    /// Endpoint that flips this probe to the opposite state.
    pub toggle_url: String,
    pub toggle_action: &'static str,
}

/// One instance card.
pub struct PodCardView {
    pub name: String,
    pub namespace: String,
    pub group_tag: String,
    pub phase: String,
    pub address: String,
    pub status_url: String,
    pub host: String,
    /// Extra CSS class: `error`, `not-ready` or empty.
    pub state_class: &'static str,
    pub has_status: bool,
    pub age: String,
    pub start_time: String,
    pub startup_delay: String,
    pub startup_ready: String,
    pub probes: Vec<ProbeView>,
    pub has_error: bool,
    pub error: String,
    pub last_check: String,
}

impl PodCardView {
    pub fn from_record(record: &StatusRecord, client: &ProbeClient) -> Self {
        let remote = record.remote();
        let error = record.error().unwrap_or_default().to_string();

        let state_class = match remote {
            _ if !error.is_empty() => "error",
            Some(status) if !status.probe_status.ready => "not-ready",
            _ => "",
        };

        let probes = remote
            .map(|status| probe_views(record, status, client))
            .unwrap_or_default();

        Self {
            name: record.name.clone(),
            namespace: record.namespace.clone(),
            group_tag: record.group_tag.clone(),
            phase: record.phase.to_string(),
            address: record.address.clone(),
            status_url: if record.address.is_empty() {
                String::new()
            } else {
                client.status_url(&record.address)
            },
            host: record.host.clone(),
            state_class,
            has_status: remote.is_some(),
            age: remote.map(|s| format_age(s.age())).unwrap_or_default(),
            start_time: remote.map(format_start_time).unwrap_or_default(),
            startup_delay: remote.map(|s| format!("{}s", s.startup_delay)).unwrap_or_default(),
            startup_ready: remote.map(|s| s.startup_ready.clone()).unwrap_or_default(),
            probes,
            has_error: !error.is_empty(),
            error,
            last_check: record.last_checked.format("%H:%M:%S").to_string(),
        }
    }
}

fn probe_views(record: &StatusRecord, status: &RemoteStatus, client: &ProbeClient) -> Vec<ProbeView> {
    ProbeKind::ALL
        .iter()
        .map(|&kind| {
            let passing = kind.flag(&status.probe_status);
            let action = ProbeAction::toggle(passing);
            ProbeView {
                kind: kind.as_str(),
                label: match kind {
                    ProbeKind::Startup => "Started",
                    ProbeKind::Liveness => "Live",
                    ProbeKind::Readiness => "Ready",
                },
                passing,
                toggle_url: client.action_url(&record.address, kind, action),
                toggle_action: action.as_str(),
            }
        })
        .collect()
}

fn format_start_time(status: &RemoteStatus) -> String {
    match status.started_at() {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
        None => status.start_time.clone(),
    }
}

/// Compact age: the two most significant units, e.g. `3d 4h`, `5m 12s`.
pub fn format_age(age: Duration) -> String {
    let seconds = age.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// Cards for every record, grouped by group tag and then ordered by identity.
pub fn build_cards(records: &[StatusRecord], client: &ProbeClient) -> Vec<PodCardView> {
    let mut ordered: Vec<&StatusRecord> = records.iter().collect();
    ordered.sort_by(|a, b| a.group_tag.cmp(&b.group_tag).then_with(|| a.name.cmp(&b.name)));
    ordered
        .into_iter()
        .map(|record| PodCardView::from_record(record, client))
        .collect()
}
