//! [`QueryMetrics`] over the global Prometheus registry.

use std::time::Duration;

use bq_05_query_orchestrator::{AuditStatus, QueryMetrics};
use bq_telemetry::metrics;
use shared_types::{DecisionReason, TransportOrigin};

#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusQueryMetrics;

impl QueryMetrics for PrometheusQueryMetrics {
    fn record_decision(&self, transport: TransportOrigin, reason: DecisionReason, elapsed: Duration) {
        metrics::record_decision(reason.as_str(), transport.as_str(), elapsed);
    }

    fn record_lookup(&self, elapsed: Duration, ok: bool) {
        metrics::record_lookup(elapsed, ok);
    }

    fn record_audit(&self, status: AuditStatus) {
        metrics::record_audit(status.as_str());
    }

    fn set_spool_depth(&self, depth: usize) {
        metrics::set_spool_depth(depth);
    }
}
