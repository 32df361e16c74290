//! Metrics collection and exposition.
//!
//! # Metrics
//! - `forwarder_requests_total` (counter): requests by service, method, status
//! - `forwarder_request_duration_seconds` (histogram): latency by service
//! - `forwarder_errors_total` (counter): gateway-detected failures by service, code
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality: no paths, no URLs

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::forward::ErrorCode;

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record one completed inbound request.
pub fn record_request(service: &str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "forwarder_requests_total",
        "service" => service.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "forwarder_request_duration_seconds",
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a failure the gateway produced itself.
pub fn record_error(service: &str, code: ErrorCode) {
    metrics::counter!(
        "forwarder_errors_total",
        "service" => service.to_string(),
        "code" => code.as_str()
    )
    .increment(1);
}
