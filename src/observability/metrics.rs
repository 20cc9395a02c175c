//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shutdown_sequences_total` (counter): sequences started, by trigger
//! - `shutdown_callbacks_total` (counter): callback outcomes (ok, error, timeout, panic, cancelled)
//! - `shutdown_errors_total` (counter): errors reported, by kind
//! - `shutdown_duration_seconds` (histogram): begin hook to end of barrier
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are bounded: trigger names and fixed outcome/kind strings

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_shutdown_started(trigger: &str) {
    metrics::counter!("shutdown_sequences_total", "trigger" => trigger.to_string()).increment(1);
}

pub fn record_callback(outcome: &'static str) {
    metrics::counter!("shutdown_callbacks_total", "outcome" => outcome).increment(1);
}

pub fn record_reported_error(kind: &'static str) {
    metrics::counter!("shutdown_errors_total", "kind" => kind).increment(1);
}

pub fn record_shutdown_duration(started: Instant) {
    metrics::histogram!("shutdown_duration_seconds").record(started.elapsed().as_secs_f64());
}
