//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by final status
//! - `gateway_parked_requests_total` (counter): requests handed to the engine
//! - `gateway_outcomes_total` (counter): parked outcomes by kind
//! - `gateway_wait_duration_seconds` (histogram): time spent parked
//! - `gateway_deliveries_total` (counter): delivered results by outcome
//! - `gateway_evictions_total` (counter): entries removed by timeout/cancel
//! - `gateway_pending_entries` (gauge): entries currently held
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

pub mod names {
    pub const REQUESTS_TOTAL: &str = "gateway_requests_total";
    pub const PARKED_TOTAL: &str = "gateway_parked_requests_total";
    pub const OUTCOMES_TOTAL: &str = "gateway_outcomes_total";
    pub const WAIT_DURATION_SECONDS: &str = "gateway_wait_duration_seconds";
    pub const DELIVERIES_TOTAL: &str = "gateway_deliveries_total";
    pub const EVICTIONS_TOTAL: &str = "gateway_evictions_total";
    pub const PENDING_ENTRIES: &str = "gateway_pending_entries";
}

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16) {
    metrics::counter!(names::REQUESTS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn record_parked() {
    metrics::counter!(names::PARKED_TOTAL).increment(1);
}

pub fn record_outcome(outcome: &'static str, waited: Duration) {
    metrics::counter!(names::OUTCOMES_TOTAL, "outcome" => outcome).increment(1);
    metrics::histogram!(names::WAIT_DURATION_SECONDS).record(waited.as_secs_f64());
}

pub fn record_delivery(outcome: &'static str) {
    metrics::counter!(names::DELIVERIES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_eviction(kind: &'static str) {
    metrics::counter!(names::EVICTIONS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_pending(count: usize) {
    metrics::gauge!(names::PENDING_ENTRIES).set(count as f64);
}
