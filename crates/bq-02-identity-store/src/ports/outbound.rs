//! Outbound (Driven) ports of the access query engine.
//!
//! These traits define the only two external dependencies the engine needs:
//! the identity store and the local audit spool.

use async_trait::async_trait;
use shared_types::{AuditRecord, MatchCandidate, Template};

use crate::adapters::spool::ReplayClaim;
use crate::domain::{SpoolError, SpooledAudit, StoreError};

/// Identity store contract.
///
/// Implementations are shared by every transport task, so they must be
/// `Send + Sync` and safe to call concurrently.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Returns scored candidates for a probe template.
    ///
    /// Candidates may belong to any finger and come in any order; the
    /// matching engine filters and ranks them.
    async fn find_candidates(&self, template: &Template) -> Result<Vec<MatchCandidate>, StoreError>;

    /// Persists one audit record.
    ///
    /// Must be atomic and idempotent on `record.audit_id`: appending a record
    /// that is already stored succeeds without creating a second row.
    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError>;

    /// Cheap round trip proving the store is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Short backend name for logs and `info` output.
    fn backend(&self) -> &'static str;
}

/// A claimed set of spooled records.
///
/// Returned by [`AuditSpool::take_batch`] and handed back through
/// [`AuditSpool::complete`] once every entry is persisted, re-queued or
/// dead-lettered.
#[derive(Debug, Default)]
pub struct SpoolBatch {
    /// Callers may move entries out; the claim is tracked separately.
    pub entries: Vec<SpooledAudit>,
    pub(crate) claimed: usize,
    pub(crate) claims: Vec<ReplayClaim>,
}

impl SpoolBatch {
    pub fn is_empty(&self) -> bool {
        self.claimed == 0
    }

    /// Number of records claimed by this batch.
    pub fn len(&self) -> usize {
        self.claimed
    }
}

/// Local durable queue for audit records the store refused.
///
/// Operations are blocking file I/O; async callers run them on the blocking
/// pool.
pub trait AuditSpool: Send + Sync {
    /// Adds a record. Fails with [`SpoolError::Full`] at capacity.
    fn enqueue(&self, entry: SpooledAudit) -> Result<(), SpoolError>;

    /// Claims every pending record. Records enqueued afterwards are not part
    /// of the batch.
    fn take_batch(&self) -> Result<SpoolBatch, SpoolError>;

    /// Releases a batch, putting `retry` back in the queue. Capacity is not
    /// enforced for re-queued records.
    fn complete(&self, batch: SpoolBatch, retry: Vec<SpooledAudit>) -> Result<(), SpoolError>;

    /// Moves a record that exhausted its attempts out of the queue for good.
    fn dead_letter(&self, entry: SpooledAudit) -> Result<(), SpoolError>;

    /// Records pending (queued or claimed).
    fn depth(&self) -> Result<usize, SpoolError>;

    /// Records parked in the dead letter file.
    fn dead_letter_depth(&self) -> Result<usize, SpoolError>;
}
