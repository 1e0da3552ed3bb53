//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fedipress_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");

    // Triage / Outbox Metrics
    pub static ref ACTIVITIES_ENQUEUED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fedipress_activities_enqueued_total", "Total number of activities enqueued into the outbox"),
        &["activity_type"]
    ).expect("metric can be created");
    pub static ref TRIAGE_SUPPRESSED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fedipress_triage_suppressed_total", "Total number of lifecycle transitions suppressed by triage"),
        &["reason"]
    ).expect("metric can be created");
    pub static ref OUTBOX_PENDING: IntGauge = IntGauge::new(
        "fedipress_outbox_pending",
        "Current number of pending outbox items"
    ).expect("metric can be created");

    // Delivery Metrics
    pub static ref DELIVERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fedipress_deliveries_total", "Total number of inbox delivery attempts"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref DELIVERY_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "fedipress_delivery_duration_seconds",
            "Inbox delivery request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("fedipress_errors_total", "Total number of application errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Register all instruments with the global registry.
///
/// Call once at startup; double registration is logged and ignored.
pub fn init_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(ACTIVITIES_ENQUEUED_TOTAL.clone()),
        Box::new(TRIAGE_SUPPRESSED_TOTAL.clone()),
        Box::new(OUTBOX_PENDING.clone()),
        Box::new(DELIVERIES_TOTAL.clone()),
        Box::new(DELIVERY_DURATION_SECONDS.clone()),
        Box::new(ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            tracing::debug!(error = %e, "Metric already registered");
        }
    }
}
