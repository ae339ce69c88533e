//! Prometheus metrics for the access query engine.
//!
//! All metrics follow the naming convention: `bq_<thing>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: decisions, audit appends, transport errors
//! - **Gauge**: spool depth
//! - **Histogram**: lookup and end-to-end request latency

use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{
    core::Collector, exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // DECISIONS
    // =========================================================================

    /// Decisions by reason and transport
    pub static ref DECISIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("bq_decisions_total", "Access decisions by reason and transport"),
        &["reason", "transport"]  // reason: MATCH/NO_MATCH/..., transport: cli/serial/tcp
    ).expect("metric creation failed");

    /// Frame received to response serialized
    pub static ref REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "bq_request_duration_seconds",
            "Time from frame received to response serialized"
        ).buckets(latency_buckets()),
        &["transport"]
    ).expect("metric creation failed");

    // =========================================================================
    // IDENTITY STORE
    // =========================================================================

    /// Candidate lookup latency
    pub static ref LOOKUP_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "bq_lookup_duration_seconds",
            "Identity store candidate lookup latency"
        ).buckets(latency_buckets()),
        &["outcome"]  // outcome: ok/error
    ).expect("metric creation failed");

    // =========================================================================
    // AUDIT
    // =========================================================================

    /// Audit commits by final status
    pub static ref AUDIT_APPENDS: IntCounterVec = IntCounterVec::new(
        Opts::new("bq_audit_appends_total", "Audit record commits by outcome"),
        &["outcome"]  // outcome: persisted/spooled/in_flight/noted/skipped/lost
    ).expect("metric creation failed");

    /// Records waiting in the local spool
    pub static ref AUDIT_SPOOL_DEPTH: IntGauge = IntGauge::new(
        "bq_audit_spool_depth",
        "Audit records waiting in the local spool"
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSPORTS
    // =========================================================================

    /// Device and socket faults
    pub static ref TRANSPORT_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("bq_transport_errors_total", "Transport faults by transport"),
        &["transport"]
    ).expect("metric creation failed");
}

/// 1 ms to ~16 s.
fn latency_buckets() -> Vec<f64> {
    exponential_buckets(0.001, 2.0, 15).unwrap_or_default()
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; metrics already registered are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn Collector>> = vec![
        Box::new(DECISIONS.clone()),
        Box::new(REQUEST_DURATION.clone()),
        Box::new(LOOKUP_DURATION.clone()),
        Box::new(AUDIT_APPENDS.clone()),
        Box::new(AUDIT_SPOOL_DEPTH.clone()),
        Box::new(TRANSPORT_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

pub fn record_decision(reason: &str, transport: &str, elapsed: Duration) {
    DECISIONS.with_label_values(&[reason, transport]).inc();
    REQUEST_DURATION
        .with_label_values(&[transport])
        .observe(elapsed.as_secs_f64());
}

pub fn record_lookup(elapsed: Duration, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    LOOKUP_DURATION
        .with_label_values(&[outcome])
        .observe(elapsed.as_secs_f64());
}

pub fn record_audit(outcome: &str) {
    AUDIT_APPENDS.with_label_values(&[outcome]).inc();
}

pub fn set_spool_depth(depth: usize) {
    AUDIT_SPOOL_DEPTH.set(i64::try_from(depth).unwrap_or(i64::MAX));
}

pub fn record_transport_error(transport: &str) {
    TRANSPORT_ERRORS.with_label_values(&[transport]).inc();
}
