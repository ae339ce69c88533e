//! Results of handling a request.

use shared_types::{AuditId, Decision, TemplateFingerprint};

use super::lifecycle::QueryLifecycle;

/// Where the request's audit record stands when the response goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    /// Appended to the identity store.
    Persisted,
    /// Store append failed; the record is in the local spool awaiting retry.
    Spooled,
    /// Still being appended when the deadline came; continues in background.
    InFlight,
    /// Rejected input: logged as an audit note, the store was not touched.
    Noted,
    /// Rejected input with audit notes disabled.
    Skipped,
    /// Neither the store nor the spool accepted the record. It was logged
    /// at error level as the last resort.
    Lost,
}

impl AuditStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Persisted => "persisted",
            AuditStatus::Spooled => "spooled",
            AuditStatus::InFlight => "in_flight",
            AuditStatus::Noted => "noted",
            AuditStatus::Skipped => "skipped",
            AuditStatus::Lost => "lost",
        }
    }
}

/// Everything a transport needs after handling one frame.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub decision: Decision,
    /// Response line for the transport, terminator included.
    pub response: Vec<u8>,
    pub lifecycle: QueryLifecycle,
    pub audit: AuditStatus,
    /// Set whenever an audit record was built.
    pub audit_id: Option<AuditId>,
    pub fingerprint: TemplateFingerprint,
}

/// Result of one spool replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub persisted: usize,
    pub requeued: usize,
    pub dead_lettered: usize,
}

impl ReplayReport {
    pub fn is_empty(&self) -> bool {
        self.persisted == 0 && self.requeued == 0 && self.dead_lettered == 0
    }
}
