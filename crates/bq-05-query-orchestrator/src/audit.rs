//! # Audit Pipeline
//!
//! Commits audit records off the response path.
//!
//! ```text
//! commit(record) ──spawn──→ append_audit ──ok──→ Persisted
//!                               │
//!                               └─ err/timeout ──→ spool.enqueue ──ok──→ Spooled
//!                                                        └─ err ──→ error! on bq::audit ──→ Lost
//!
//! retry loop ──every interval──→ replay_spooled()
//!     take_batch ──→ append each ──ok──→ dropped from spool
//!                        └─ err ──→ attempts += 1 ──→ requeue, or dead letter at max_attempts
//! ```
//!
//! Appends run as tasks owned by the pipeline, not by the request, so a
//! dropped connection or an expired deadline never cancels one.

use std::sync::Arc;
use std::time::Duration;

use bq_02_identity_store::{AuditSpool, IdentityStore, SpoolError, SpooledAudit, StoreError};
use parking_lot::Mutex;
use shared_types::AuditRecord;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::domain::{AuditStatus, ReplayReport};
use crate::ports::QueryMetrics;

/// Resolves to the final [`AuditStatus`] of one committed record.
pub struct AuditHandle {
    rx: oneshot::Receiver<AuditStatus>,
}

impl AuditHandle {
    pub async fn wait(self) -> AuditStatus {
        // A dropped sender means the task died before reporting.
        self.rx.await.unwrap_or(AuditStatus::Lost)
    }
}

struct PipelineInner {
    store: Arc<dyn IdentityStore>,
    spool: Arc<dyn AuditSpool>,
    metrics: Arc<dyn QueryMetrics>,
    audit_timeout: Duration,
    max_attempts: u32,
    tasks: Mutex<JoinSet<()>>,
    replaying: tokio::sync::Mutex<()>,
}

#[derive(Clone)]
pub struct AuditPipeline {
    inner: Arc<PipelineInner>,
}

impl AuditPipeline {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        spool: Arc<dyn AuditSpool>,
        metrics: Arc<dyn QueryMetrics>,
        audit_timeout: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                store,
                spool,
                metrics,
                audit_timeout,
                max_attempts,
                tasks: Mutex::new(JoinSet::new()),
                replaying: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Starts appending `record` in the background.
    pub fn commit(&self, record: AuditRecord) -> AuditHandle {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);

        let mut tasks = self.inner.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let status = inner.persist(record).await;
            inner.metrics.record_audit(status);
            let _ = tx.send(status);
        });

        AuditHandle { rx }
    }

    /// Commits still running.
    pub fn in_flight(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    /// Waits for every commit started so far.
    pub async fn flush(&self) {
        let mut tasks = std::mem::take(&mut *self.inner.tasks.lock());
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(target: "bq::audit", error = %e, "audit commit task failed");
            }
        }
    }

    /// One pass over the spool. Concurrent calls in this process queue up.
    pub async fn replay_spooled(&self) -> Result<ReplayReport, SpoolError> {
        let _single_flight = self.inner.replaying.lock().await;
        let inner = &self.inner;

        let mut batch = inner.blocking(|spool| spool.take_batch()).await?;
        let mut report = ReplayReport::default();
        if batch.is_empty() {
            inner.refresh_depth().await;
            return Ok(report);
        }

        let entries = std::mem::take(&mut batch.entries);
        let mut retry = Vec::new();
        let mut store_down: Option<String> = None;

        for entry in entries {
            if entry.attempts >= inner.max_attempts {
                inner.dead_letter(entry).await?;
                report.dead_lettered += 1;
                continue;
            }
            // Once the store refuses one record, leave the rest for next pass
            // without charging them an attempt.
            if store_down.is_some() {
                retry.push(entry);
                continue;
            }

            match inner.append(&entry.record).await {
                Ok(()) => {
                    debug!(target: "bq::audit", audit_id = %entry.record.audit_id, attempts = entry.attempts, "spooled audit persisted");
                    inner.metrics.record_audit(AuditStatus::Persisted);
                    report.persisted += 1;
                }
                Err(e) => {
                    let entry = entry.failed_again(&e);
                    store_down = Some(e.to_string());
                    if entry.attempts >= inner.max_attempts {
                        inner.dead_letter(entry).await?;
                        report.dead_lettered += 1;
                    } else {
                        retry.push(entry);
                    }
                }
            }
        }

        report.requeued = retry.len();
        inner
            .blocking(move |spool| spool.complete(batch, retry))
            .await?;
        inner.refresh_depth().await;

        if let Some(error) = store_down {
            warn!(target: "bq::audit", requeued = report.requeued, error = %error, "identity store still refusing audit appends");
        }
        Ok(report)
    }

    /// Replays the spool every `interval` until `shutdown` flips to true.
    pub async fn run_retry_loop(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.replay_spooled().await {
                        Ok(report) if !report.is_empty() => info!(
                            target: "bq::audit",
                            persisted = report.persisted,
                            requeued = report.requeued,
                            dead_lettered = report.dead_lettered,
                            "audit spool replayed"
                        ),
                        Ok(_) => {}
                        Err(e) => warn!(target: "bq::audit", error = %e, "audit spool replay failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("audit retry loop stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Pending spool depth.
    pub async fn spool_depth(&self) -> Result<usize, SpoolError> {
        self.inner.blocking(|spool| spool.depth()).await
    }

    pub async fn dead_letter_depth(&self) -> Result<usize, SpoolError> {
        self.inner.blocking(|spool| spool.dead_letter_depth()).await
    }
}

impl PipelineInner {
    async fn append(&self, record: &AuditRecord) -> Result<(), StoreError> {
        match tokio::time::timeout(self.audit_timeout, self.store.append_audit(record)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.audit_timeout)),
        }
    }

    async fn persist(&self, record: AuditRecord) -> AuditStatus {
        match self.append(&record).await {
            Ok(()) => {
                debug!(target: "bq::audit", audit_id = %record.audit_id, "audit record persisted");
                AuditStatus::Persisted
            }
            Err(e) => self.spool_record(record, e).await,
        }
    }

    async fn spool_record(&self, record: AuditRecord, cause: StoreError) -> AuditStatus {
        let entry = SpooledAudit::new(record.clone(), &cause);
        match self.blocking(move |spool| spool.enqueue(entry)).await {
            Ok(()) => {
                warn!(
                    target: "bq::audit",
                    audit_id = %record.audit_id,
                    error = %cause,
                    "audit append failed; record spooled for retry"
                );
                self.refresh_depth().await;
                AuditStatus::Spooled
            }
            Err(spool_error) => {
                let decision = &record.decision;
                error!(
                    target: "bq::audit",
                    audit_id = %record.audit_id,
                    unit = %record.unit_code,
                    transport = %record.transport,
                    finger = ?record.claimed_finger,
                    fingerprint = %record.template_fingerprint,
                    granted = decision.granted(),
                    reason = %decision.reason(),
                    identity = ?decision.identity_id(),
                    score = ?decision.score_used(),
                    decided_at = %decision.decided_at(),
                    store_error = %cause,
                    spool_error = %spool_error,
                    "audit record could not be persisted or spooled"
                );
                AuditStatus::Lost
            }
        }
    }

    async fn dead_letter(&self, entry: SpooledAudit) -> Result<(), SpoolError> {
        error!(
            target: "bq::audit",
            audit_id = %entry.record.audit_id,
            attempts = entry.attempts,
            last_error = %entry.last_error,
            "audit record exhausted its retries; moved to dead letter"
        );
        self.blocking(move |spool| spool.dead_letter(entry)).await
    }

    async fn refresh_depth(&self) {
        if let Ok(depth) = self.blocking(|spool| spool.depth()).await {
            self.metrics.set_spool_depth(depth);
        }
    }

    /// Runs a spool operation on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T, SpoolError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn AuditSpool) -> Result<T, SpoolError> + Send + 'static,
    {
        let spool = Arc::clone(&self.spool);
        tokio::task::spawn_blocking(move || op(spool.as_ref()))
            .await
            .map_err(|e| SpoolError::Io(format!("spool task failed: {e}")))?
    }
}
