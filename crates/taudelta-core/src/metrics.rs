//! Prometheus metrics helpers for the gateway.
//!
//! # Usage
//!
//! ```rust,ignore
//! use taudelta_core::metrics::{init_metrics, start_metrics_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let handle = init_metrics();
//!     start_metrics_server(9091, handle).await.unwrap();
//!
//!     metrics::counter!("ingest_points_total").increment(1);
//! }
//! ```
//!
//! # Metric Naming Conventions
//!
//! - Prefix: component name (`discovery_`, `ingest_`, `notify_`, `index_`)
//! - Suffix: unit or type (`_total`, `_seconds`)
//! - No per-member labels: member and consumer ids are unbounded

use std::net::SocketAddr;

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
///
/// Returns `None` if a recorder is already installed for this process.
pub fn init_metrics() -> Option<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().ok()?;
    register_metrics();
    Some(handle)
}

/// Start the Prometheus metrics HTTP server.
///
/// Binds `0.0.0.0:{port}` and serves `/metrics` from a background task.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    Ok(())
}

/// Register descriptions for every metric the gateway records.
fn register_metrics() {
    // =========================================================================
    // Discovery
    // =========================================================================

    describe_counter!("discovery_runs_total", "Discovery passes started");
    describe_counter!(
        "discovery_failures_total",
        "Discovery passes aborted by a store error"
    );
    describe_histogram!(
        "discovery_duration_seconds",
        "Wall time of successful discovery passes"
    );
    describe_gauge!("discovery_members", "Members found by the last discovery pass");
    describe_gauge!(
        "discovery_consumers",
        "Consumers found by the last discovery pass"
    );
    describe_gauge!("index_members", "Members currently held in the membership index");

    // =========================================================================
    // Ingest
    // =========================================================================

    describe_counter!("ingest_points_total", "Points persisted to the store");
    describe_counter!("ingest_rejected_total", "Ingest requests failing validation");
    describe_counter!(
        "ingest_write_failures_total",
        "Ingest requests whose store write failed"
    );
    describe_counter!(
        "ingest_unindexed_total",
        "Points written for consumers absent from the membership index"
    );

    // =========================================================================
    // Notification forwarding
    // =========================================================================

    describe_counter!("notify_sent_total", "Notifications accepted by the endpoint");
    describe_counter!(
        "notify_failures_total",
        "Notifications that failed (transport error or non-success status)"
    );
    describe_counter!(
        "notify_skipped_total",
        "Notifications skipped because no endpoint is configured"
    );
}

// =============================================================================
// Metric Recording Helpers
// =============================================================================

/// Increment a counter.
#[inline]
pub fn increment(name: &'static str, count: u64) {
    metrics::counter!(name).increment(count);
}

/// Set a gauge value.
#[inline]
pub fn set_gauge(name: &'static str, value: f64) {
    metrics::gauge!(name).set(value);
}

/// Record a duration sample in seconds.
#[inline]
pub fn record_seconds(name: &'static str, elapsed: std::time::Duration) {
    metrics::histogram!(name).record(elapsed.as_secs_f64());
}
