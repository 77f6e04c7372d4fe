//! Prometheus metrics for rankings, refreshes and HTTP traffic

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, Encoder,
    HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};
use std::time::Duration;

static REFRESH_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "leaderboard_refresh_runs_total",
        "Total ranking refreshes by slot and outcome (success/error/joined)",
        &["slot", "status"]
    )
    .expect("Failed to register refresh runs metric")
});

static REFRESH_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "leaderboard_refresh_duration_seconds",
        "Duration of a full ranking refresh",
        &["slot"],
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .expect("Failed to register refresh duration metric")
});

static REFRESH_SKIPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "leaderboard_refresh_skipped_total",
        "Users or posts skipped during refresh because of upstream errors",
        &["slot"]
    )
    .expect("Failed to register refresh skipped metric")
});

static SNAPSHOT_WRITE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "leaderboard_snapshot_write_failures_total",
        "Snapshot writes that failed after a refresh",
        &["slot"]
    )
    .expect("Failed to register snapshot failure metric")
});

static SLOT_SIZE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "leaderboard_slot_size",
        "Items currently held by each ranking slot",
        &["slot"]
    )
    .expect("Failed to register slot size metric")
});

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "leaderboard_http_requests_total",
        "HTTP requests by method, route and status",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP requests metric")
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "leaderboard_http_request_duration_seconds",
        "HTTP request latency",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
    )
    .expect("Failed to register HTTP duration metric")
});

/// Record a refresh outcome (success/error/joined)
pub fn record_refresh(slot: &str, status: &str) {
    REFRESH_RUNS_TOTAL.with_label_values(&[slot, status]).inc();
}

pub fn record_refresh_duration(slot: &str, duration: Duration) {
    REFRESH_DURATION_SECONDS
        .with_label_values(&[slot])
        .observe(duration.as_secs_f64());
}

pub fn record_skipped(slot: &str, count: usize) {
    REFRESH_SKIPPED_TOTAL
        .with_label_values(&[slot])
        .inc_by(count as u64);
}

pub fn record_snapshot_write_failure(slot: &str) {
    SNAPSHOT_WRITE_FAILURES_TOTAL.with_label_values(&[slot]).inc();
}

pub fn set_slot_size(slot: &str, size: usize) {
    SLOT_SIZE.with_label_values(&[slot]).set(size as i64);
}

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(elapsed.as_secs_f64());
}

/// GET /metrics
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
