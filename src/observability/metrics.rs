//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define monitor metrics (cycles, fetch failures, relays, store size)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `podmon_cycles_total` (counter): completed cycles by outcome
//! - `podmon_cycle_duration_seconds` (histogram): time per cycle
//! - `podmon_instances` (gauge): records in the store
//! - `podmon_fetch_failures_total` (counter): failed status fetches
//! - `podmon_relay_requests_total` (counter): forwarded actions by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The exporter runs its own listener, separate from the API server

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cycle(outcome: &'static str, elapsed: Duration) {
    counter!("podmon_cycles_total", "outcome" => outcome).increment(1);
    histogram!("podmon_cycle_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_store_size(size: usize) {
    gauge!("podmon_instances").set(size as f64);
}

pub fn record_fetch_failure() {
    counter!("podmon_fetch_failures_total").increment(1);
}

pub fn record_relay(outcome: &'static str) {
    counter!("podmon_relay_requests_total", "outcome" => outcome).increment(1);
}
