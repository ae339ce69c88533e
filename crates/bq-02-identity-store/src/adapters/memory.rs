//! In-process identity store.
//!
//! Backs the `memory` store backend (seeded from an enrollment fixture) and
//! every test that needs a store. Fault injection covers the failure modes
//! the orchestrator must survive: slow lookups, failing lookups and audit
//! appends that fail a given number of times before recovering.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{AuditId, AuditRecord, MatchCandidate, Template};
use tracing::debug;

use crate::domain::{score_enrolled, EnrolledTemplate, EnrollmentFixture, StoreError};
use crate::ports::outbound::IdentityStore;

/// Injected failures.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Delay before every lookup completes.
    pub lookup_delay: Option<Duration>,
    /// Every lookup fails with `Unavailable` (after the delay).
    pub fail_lookups: bool,
    /// Delay before every audit append completes.
    pub audit_delay: Option<Duration>,
    /// The next N audit appends fail with `Unavailable`.
    pub failing_audit_appends: u32,
}

#[derive(Default)]
struct AuditLog {
    records: Vec<AuditRecord>,
    seen: HashSet<AuditId>,
}

pub struct InMemoryIdentityStore {
    enrolled: RwLock<Vec<EnrolledTemplate>>,
    audit: Mutex<AuditLog>,
    faults: Mutex<FaultPlan>,
    lookups: AtomicUsize,
    audit_attempts: AtomicUsize,
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            enrolled: RwLock::new(Vec::new()),
            audit: Mutex::new(AuditLog::default()),
            faults: Mutex::new(FaultPlan::default()),
            lookups: AtomicUsize::new(0),
            audit_attempts: AtomicUsize::new(0),
        }
    }

    pub fn with_enrolled(templates: Vec<EnrolledTemplate>) -> Self {
        let store = Self::new();
        *store.enrolled.write() = templates;
        store
    }

    /// Loads an enrollment fixture file.
    pub fn from_fixture_file(path: &Path) -> Result<Self, StoreError> {
        let templates = EnrollmentFixture::load(path)?.into_templates()?;
        debug!(path = %path.display(), count = templates.len(), "enrollment fixture loaded");
        Ok(Self::with_enrolled(templates))
    }

    pub fn enroll(&self, template: EnrolledTemplate) {
        self.enrolled.write().push(template);
    }

    pub fn enrolled_count(&self) -> usize {
        self.enrolled.read().len()
    }

    pub fn set_faults(&self, plan: FaultPlan) {
        *self.faults.lock() = plan;
    }

    /// Lookups attempted so far, including failed ones.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Audit appends attempted so far, including failed and duplicate ones.
    pub fn audit_attempt_count(&self) -> usize {
        self.audit_attempts.load(Ordering::SeqCst)
    }

    /// Persisted audit records in append order.
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit.lock().records.clone()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_candidates(&self, template: &Template) -> Result<Vec<MatchCandidate>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let (delay, fail) = {
            let faults = self.faults.lock();
            (faults.lookup_delay, faults.fail_lookups)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(StoreError::Unavailable("injected lookup failure".to_string()));
        }

        let enrolled = self.enrolled.read();
        score_enrolled(template, enrolled.iter())
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError> {
        self.audit_attempts.fetch_add(1, Ordering::SeqCst);
        let delay = self.faults.lock().audit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        {
            let mut faults = self.faults.lock();
            if faults.failing_audit_appends > 0 {
                faults.failing_audit_appends -= 1;
                return Err(StoreError::Unavailable(
                    "injected audit failure".to_string(),
                ));
            }
        }

        let mut audit = self.audit.lock();
        if audit.seen.insert(record.audit_id) {
            audit.records.push(record.clone());
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.faults.lock().fail_lookups {
            return Err(StoreError::Unavailable("injected lookup failure".to_string()));
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
