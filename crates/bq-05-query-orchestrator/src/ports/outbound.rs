//! Outbound (Driven) ports of the orchestrator.
//!
//! The identity store and audit spool ports live with their adapters in
//! `bq-02-identity-store`; these are the remaining two.

use std::time::Duration;

use chrono::{DateTime, Utc};
use shared_types::{DecisionReason, TransportOrigin};

use crate::domain::AuditStatus;

/// Wall-clock source for decision and audit timestamps.
///
/// Deadlines use tokio's monotonic clock instead, so tests can pause time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Metrics sink. Implemented over Prometheus by the node binary.
pub trait QueryMetrics: Send + Sync {
    fn record_decision(&self, transport: TransportOrigin, reason: DecisionReason, elapsed: Duration);

    fn record_lookup(&self, elapsed: Duration, ok: bool);

    fn record_audit(&self, status: AuditStatus);

    fn set_spool_depth(&self, depth: usize);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl QueryMetrics for NoopMetrics {
    fn record_decision(&self, _: TransportOrigin, _: DecisionReason, _: Duration) {}

    fn record_lookup(&self, _: Duration, _: bool) {}

    fn record_audit(&self, _: AuditStatus) {}

    fn set_spool_depth(&self, _: usize) {}
}

/// Fixed clock for tests.
#[cfg(test)]
pub struct MockClock {
    now: parking_lot::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl MockClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: parking_lot::Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
