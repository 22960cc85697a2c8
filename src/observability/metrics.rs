//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define core lifecycle metrics
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `memcore_bringup_attempts_total` (counter): attempts by outcome
//! - `memcore_bringup_step_seconds` (histogram): init duration per step
//! - `memcore_module_status` (gauge): 0=unknown, 1=succeeded, 2=failed
//! - `memcore_clock_relative_seconds` (gauge): current relative time
//! - `memcore_pool_objects_outstanding` (gauge): checked-out objects per pool
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op
//! - Low-overhead metric updates from the tick path

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the duration of a single bring-up step.
pub fn record_step(step: &'static str, started: Instant) {
    histogram!("memcore_bringup_step_seconds", "step" => step)
        .record(started.elapsed().as_secs_f64());
}

/// Record the outcome of a bring-up attempt.
pub fn record_attempt(succeeded: bool) {
    let outcome = if succeeded { "succeeded" } else { "failed" };
    counter!("memcore_bringup_attempts_total", "outcome" => outcome).increment(1);
}

/// Publish the module status as a numeric gauge.
pub fn record_module_status(code: u8) {
    gauge!("memcore_module_status").set(code as f64);
}

/// Publish the relative clock value.
pub fn record_clock(current: u32) {
    gauge!("memcore_clock_relative_seconds").set(current as f64);
}

/// Publish the outstanding object count of a pool.
pub fn record_pool_outstanding(pool: &'static str, outstanding: usize) {
    gauge!("memcore_pool_objects_outstanding", "pool" => pool).set(outstanding as f64);
}
