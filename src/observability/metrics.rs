//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus exporter endpoint
//! - Record per-request counters and latency
//! - Record the periodic resource-usage gauge batch
//!
//! # Metrics
//! - `fib_requests_total` (counter): requests by route and status
//! - `fib_request_duration_seconds` (histogram): handler latency by route
//! - `fib_mem_usage_bytes` (gauge): process memory
//! - `fib_disk_usage_bytes` / `fib_disk_quota_bytes` (gauge): working-dir
//!   filesystem usage
//! - `fib_tasks_alive` (gauge): live async tasks on the runtime
//!
//! Resource gauges carry `app` and `container_id` labels supplied by the
//! sampler from the process environment.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::sampler::ResourceSample;

/// Install the Prometheus exporter on `addr` and describe all series.
///
/// Failure to bind the exporter is logged and leaves the metric macros as
/// no-ops; it never takes the service down.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        return;
    }

    describe_counter!("fib_requests_total", "Requests served, by route and status.");
    describe_histogram!(
        "fib_request_duration_seconds",
        "Handler latency in seconds, by route."
    );
    describe_gauge!("fib_mem_usage_bytes", "Amount of memory used.");
    describe_gauge!("fib_disk_usage_bytes", "Amount of disk used.");
    describe_gauge!("fib_disk_quota_bytes", "Amount of disk quota available.");
    describe_gauge!("fib_tasks_alive", "Amount of async tasks running.");

    tracing::info!(address = %addr, "Metrics exporter listening");
}

/// Record one served request.
pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "fib_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!(
        "fib_request_duration_seconds",
        "route" => route.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one resource sample as a single batch of labeled gauges.
pub fn record_resource_usage(sample: &ResourceSample, app: &str, container_id: &str) {
    let labels = [
        ("app", app.to_string()),
        ("container_id", container_id.to_string()),
    ];
    gauge!("fib_mem_usage_bytes", &labels).set(sample.memory_used_bytes as f64);
    gauge!("fib_disk_usage_bytes", &labels).set(sample.disk_used_bytes);
    gauge!("fib_disk_quota_bytes", &labels).set(sample.disk_quota_bytes);
    gauge!("fib_tasks_alive", &labels).set(sample.tasks_alive as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // With no recorder installed the macros are no-ops; recording must not
    // panic in that state.
    #[test]
    fn recording_without_exporter_is_harmless() {
        record_request("/fib", 200, Instant::now());
        let sample = ResourceSample {
            memory_used_bytes: 1,
            disk_used_bytes: 2.0,
            disk_quota_bytes: 3.0,
            tasks_alive: 4,
            timestamp: 5,
        };
        record_resource_usage(&sample, "app", "host");
    }
}
