//! Prometheus metrics exposition
//!
//! Service metrics recorded here:
//!
//! - `dashboard_requests_total` (counter): labels `status`, `method`
//! - `dashboard_request_duration_seconds` (histogram): label `status`
//!
//! The gateway crate records `gateway_*` counters through the same global
//! recorder, so `/metrics` renders both.

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "dashboard_request_duration_seconds";

/// Histogram buckets from 5ms up to the 60s ceiling of backend timeouts
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
}

/// Install the global Prometheus recorder and return a handle for rendering.
///
/// Must run before any metric is emitted; later calls fail because only one
/// global recorder can exist per process.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Record a completed inbound request.
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("dashboard_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!(DURATION_METRIC, "status" => status_str).record(duration_secs);
}
