//! Shared test fixtures.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bq_02_identity_store::{AuditSpool, IdentityStore, InMemoryAuditSpool, StoreError};
use bq_03_matching_engine::MatchPolicy;
use bq_04_request_protocol::encode_query_frame;
use bq_05_query_orchestrator::{OrchestratorConfig, QueryOrchestrator};
use parking_lot::Mutex;
use shared_types::{
    AuditId, AuditRecord, FingerPosition, IdentityId, MatchCandidate, Template, TemplateId,
};

/// 16-byte probe used by the acceptance scenarios.
pub const PROBE: [u8; 16] = [
    0x03, 0x01, 0x5d, 0x1e, 0xff, 0xfe, 0xf8, 0x1e, 0xe0, 0x06, 0xc0, 0x02, 0x80, 0x00, 0x00, 0x01,
];

/// Identity store that answers every lookup with a fixed candidate list.
///
/// Counts every interaction so tests can assert that rejected input never
/// reached it.
#[derive(Default)]
pub struct ScriptedIdentityStore {
    candidates: Mutex<Vec<MatchCandidate>>,
    lookup_delay: Mutex<Option<Duration>>,
    failing_lookups: AtomicU32,
    failing_appends: AtomicU32,
    lookups: AtomicUsize,
    append_attempts: AtomicUsize,
    records: Mutex<Vec<AuditRecord>>,
    seen: Mutex<HashSet<AuditId>>,
}

impl ScriptedIdentityStore {
    pub fn new(candidates: Vec<MatchCandidate>) -> Self {
        Self {
            candidates: Mutex::new(candidates),
            ..Self::default()
        }
    }

    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock() = Some(delay);
    }

    /// The next `n` lookups fail.
    pub fn fail_lookups(&self, n: u32) {
        self.failing_lookups.store(n, Ordering::SeqCst);
    }

    /// The next `n` audit appends fail.
    pub fn fail_appends(&self, n: u32) {
        self.failing_appends.store(n, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn append_attempts(&self) -> usize {
        self.append_attempts.load(Ordering::SeqCst)
    }

    /// Lookups plus append attempts.
    pub fn interactions(&self) -> usize {
        self.lookups() + self.append_attempts()
    }

    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl IdentityStore for ScriptedIdentityStore {
    async fn find_candidates(&self, _template: &Template) -> Result<Vec<MatchCandidate>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let delay = *self.lookup_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if Self::take_failure(&self.failing_lookups) {
            return Err(StoreError::Unavailable("scripted lookup failure".to_string()));
        }
        Ok(self.candidates.lock().clone())
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError> {
        self.append_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_appends) {
            return Err(StoreError::Unavailable("scripted append failure".to_string()));
        }
        if self.seen.lock().insert(record.audit_id) {
            self.records.lock().push(record.clone());
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "scripted"
    }
}

pub fn candidate(identity: i64, template: i64, score: f64, finger: FingerPosition) -> MatchCandidate {
    MatchCandidate::new(IdentityId(identity), TemplateId(template), score, finger)
        .expect("valid candidate score")
}

/// `QUERY:<base64 PROBE>:<finger>` without terminator.
pub fn probe_frame(finger: FingerPosition) -> Vec<u8> {
    encode_query_frame(&PROBE, finger).into_bytes()
}

pub fn config(threshold: f64, deadline: Duration) -> OrchestratorConfig {
    OrchestratorConfig {
        unit_code: "TEST-GATE".to_string(),
        deadline,
        matching: MatchPolicy { threshold },
        ..OrchestratorConfig::default()
    }
}

/// Orchestrator over `store` with an in-memory spool.
pub fn orchestrator(
    store: Arc<ScriptedIdentityStore>,
    config: OrchestratorConfig,
) -> (QueryOrchestrator, Arc<InMemoryAuditSpool>) {
    let spool = Arc::new(InMemoryAuditSpool::new(1_000));
    let orchestrator = with_spool(store, config, spool.clone());
    (orchestrator, spool)
}

pub fn with_spool(
    store: Arc<ScriptedIdentityStore>,
    config: OrchestratorConfig,
    spool: Arc<dyn AuditSpool>,
) -> QueryOrchestrator {
    QueryOrchestrator::new(config, store, spool).expect("valid orchestrator config")
}
