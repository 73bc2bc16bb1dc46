//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "trackfit_requests_total",
        "Total number of requests processed"
    );
    metrics::describe_counter!(
        "trackfit_cache_operations_total",
        "Cache lookups, fills and invalidations"
    );
    metrics::describe_counter!(
        "trackfit_store_writes_total",
        "Documents inserted, updated or deleted"
    );
    metrics::describe_histogram!(
        "trackfit_request_duration_seconds",
        "Request duration in seconds"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a handled request
pub fn record_request(method: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "trackfit_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("trackfit_request_duration_seconds", "method" => method.to_string())
        .record(duration_secs);
}

/// Record cache operation
pub fn record_cache_operation(kind: &str, operation: &str, result: &str) {
    metrics::counter!(
        "trackfit_cache_operations_total",
        "kind" => kind.to_string(),
        "operation" => operation.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record documents written to the store
pub fn record_store_write(kind: &str, operation: &str, count: u64) {
    metrics::counter!(
        "trackfit_store_writes_total",
        "kind" => kind.to_string(),
        "operation" => operation.to_string()
    )
    .increment(count);
}
