//! The query orchestrator service.

use std::sync::Arc;

use bq_01_template_codec::{fingerprint, normalize, TemplateCodec};
use bq_02_identity_store::{AuditSpool, IdentityStore};
use bq_03_matching_engine::MatchingEngine;
use bq_04_request_protocol::{
    serialize_response, split_frame, validate_fields, ParseError, ResponseStyle,
};
use shared_types::{
    AuditRecord, Decision, DecisionReason, FingerPosition, TemplateFingerprint, TransportOrigin,
};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::audit::{AuditHandle, AuditPipeline};
use crate::domain::{
    AuditStatus, OrchestratorConfig, OrchestratorError, QueryLifecycle, QueryOutcome, QueryState,
};
use crate::ports::{Clock, NoopMetrics, QueryMetrics, SystemClock};

struct OrchestratorInner {
    config: OrchestratorConfig,
    codec: TemplateCodec,
    engine: MatchingEngine,
    store: Arc<dyn IdentityStore>,
    audit: AuditPipeline,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn QueryMetrics>,
}

/// Turns frames into responses. Cheap to clone; every transport task holds
/// one.
#[derive(Clone)]
pub struct QueryOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl QueryOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn IdentityStore>,
        spool: Arc<dyn AuditSpool>,
    ) -> Result<Self, OrchestratorError> {
        Self::with_ports(
            config,
            store,
            spool,
            Arc::new(SystemClock),
            Arc::new(NoopMetrics),
        )
    }

    pub fn with_ports(
        config: OrchestratorConfig,
        store: Arc<dyn IdentityStore>,
        spool: Arc<dyn AuditSpool>,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn QueryMetrics>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let codec = TemplateCodec::new(config.codec);
        let engine = MatchingEngine::new(config.matching)?;
        let audit = AuditPipeline::new(
            Arc::clone(&store),
            spool,
            Arc::clone(&metrics),
            config.audit_timeout,
            config.max_audit_attempts,
        );
        Ok(Self {
            inner: Arc::new(OrchestratorInner {
                config,
                codec,
                engine,
                store,
                audit,
                clock,
                metrics,
            }),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn audit_pipeline(&self) -> &AuditPipeline {
        &self.inner.audit
    }

    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.inner.store
    }

    /// Handles one raw frame from `origin`. Never fails: every problem
    /// becomes a deny decision with a response line.
    #[instrument(skip(self, raw), fields(transport = %origin, bytes = raw.len()))]
    pub async fn handle_frame(&self, raw: &[u8], origin: TransportOrigin) -> QueryOutcome {
        let inner = &self.inner;
        let started = Instant::now();
        let deadline = started + inner.config.deadline;
        let received_at = inner.clock.now();
        let mut lifecycle = QueryLifecycle::new();

        // RECEIVED → PARSED
        let fields = match split_frame(raw) {
            Ok(fields) => fields,
            Err(err) => {
                return self.reject(err, fingerprint(raw), None, lifecycle, origin, started);
            }
        };
        self.advance(&mut lifecycle, QueryState::Parsed);

        // PARSED → VALIDATED
        let request = match validate_fields(&fields, origin, received_at, &inner.codec) {
            Ok(request) => request,
            Err(err) => {
                let finger = normalize(fields.finger).ok();
                let fp = fingerprint(fields.template.as_bytes());
                return self.reject(err, fp, finger, lifecycle, origin, started);
            }
        };
        self.advance(&mut lifecycle, QueryState::Validated);
        let fp = fingerprint(request.template.as_bytes());
        let finger = request.claimed_finger;

        // VALIDATED → MATCHED | FAILED(STORE_ERROR | TIMEOUT)
        let lookup_started = Instant::now();
        let lookup = timeout_at(deadline, inner.store.find_candidates(&request.template)).await;
        let decision = match lookup {
            Ok(Ok(candidates)) => {
                inner.metrics.record_lookup(lookup_started.elapsed(), true);
                let evaluation = inner.engine.evaluate(&candidates, finger, inner.clock.now());
                debug!(
                    fingerprint = %fp,
                    considered = evaluation.considered,
                    same_finger = evaluation.same_finger,
                    best_score = ?evaluation.best.map(|(_, score)| score),
                    "candidates evaluated"
                );
                self.advance(&mut lifecycle, QueryState::Matched);
                evaluation.decision
            }
            Ok(Err(e)) => {
                inner.metrics.record_lookup(lookup_started.elapsed(), false);
                warn!(fingerprint = %fp, error = %e, "identity lookup failed; denying");
                self.advance(&mut lifecycle, QueryState::Failed(DecisionReason::StoreError));
                Decision::deny(DecisionReason::StoreError, None, inner.clock.now())
            }
            Err(_) => {
                inner.metrics.record_lookup(lookup_started.elapsed(), false);
                warn!(
                    fingerprint = %fp,
                    deadline_ms = inner.config.deadline.as_millis() as u64,
                    "identity lookup exceeded deadline; denying"
                );
                self.advance(&mut lifecycle, QueryState::Failed(DecisionReason::Timeout));
                Decision::deny(DecisionReason::Timeout, None, inner.clock.now())
            }
        };

        // MATCHED → AUDITED → RESPONDED
        let record = AuditRecord::for_decision(
            inner.config.unit_code.clone(),
            origin,
            Some(finger),
            fp.clone(),
            decision.clone(),
            inner.clock.now(),
        );
        let audit_id = record.audit_id;
        let handle = inner.audit.commit(record);
        let audit = Self::await_audit(handle, deadline).await;

        if lifecycle.current() == QueryState::Matched {
            if audit == AuditStatus::Persisted {
                self.advance(&mut lifecycle, QueryState::Audited);
            }
            self.advance(&mut lifecycle, QueryState::Responded);
        }

        self.finish(decision, lifecycle, audit, Some(audit_id), fp, origin, started)
    }

    /// Answers a frame the transport could not deliver intact, such as one
    /// over the size limit. Counted and audited like any malformed frame.
    pub fn reject_frame(&self, origin: TransportOrigin, detail: impl Into<String>) -> QueryOutcome {
        let started = Instant::now();
        let err = ParseError::MalformedFrame(detail.into());
        self.reject(err, fingerprint(&[]), None, QueryLifecycle::new(), origin, started)
    }

    /// Input rejected before validation completed. The store is never
    /// touched; the audit record is emitted as a note on `bq::audit`.
    fn reject(
        &self,
        err: ParseError,
        fp: TemplateFingerprint,
        finger: Option<FingerPosition>,
        mut lifecycle: QueryLifecycle,
        origin: TransportOrigin,
        started: Instant,
    ) -> QueryOutcome {
        let inner = &self.inner;
        let reason = err.reason();
        self.advance(&mut lifecycle, QueryState::Failed(reason));
        warn!(fingerprint = %fp, reason = %reason, error = %err, "request rejected");

        let decision = Decision::deny(reason, None, inner.clock.now());
        let (audit, audit_id) = if inner.config.audit_rejections {
            let record = AuditRecord::for_decision(
                inner.config.unit_code.clone(),
                origin,
                finger,
                fp.clone(),
                decision.clone(),
                inner.clock.now(),
            );
            info!(
                target: "bq::audit",
                audit_id = %record.audit_id,
                unit = %record.unit_code,
                transport = %record.transport,
                finger = ?record.claimed_finger,
                fingerprint = %record.template_fingerprint,
                granted = false,
                reason = %reason,
                decided_at = %decision.decided_at(),
                "audit note: request rejected before lookup"
            );
            (AuditStatus::Noted, Some(record.audit_id))
        } else {
            (AuditStatus::Skipped, None)
        };
        inner.metrics.record_audit(audit);

        self.finish(decision, lifecycle, audit, audit_id, fp, origin, started)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        decision: Decision,
        lifecycle: QueryLifecycle,
        audit: AuditStatus,
        audit_id: Option<shared_types::AuditId>,
        fp: TemplateFingerprint,
        origin: TransportOrigin,
        started: Instant,
    ) -> QueryOutcome {
        let elapsed = started.elapsed();
        self.inner
            .metrics
            .record_decision(origin, decision.reason(), elapsed);
        info!(
            fingerprint = %fp,
            granted = decision.granted(),
            reason = %decision.reason(),
            identity = ?decision.identity_id(),
            audit = audit.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "access decision"
        );

        QueryOutcome {
            response: serialize_response(&decision, ResponseStyle::for_origin(origin)),
            decision,
            lifecycle,
            audit,
            audit_id,
            fingerprint: fp,
        }
    }

    /// Waits for the audit until the deadline. A late audit keeps running and
    /// never changes the decision.
    async fn await_audit(handle: AuditHandle, deadline: Instant) -> AuditStatus {
        timeout_at(deadline, handle.wait())
            .await
            .unwrap_or(AuditStatus::InFlight)
    }

    fn advance(&self, lifecycle: &mut QueryLifecycle, next: QueryState) {
        if let Err(e) = lifecycle.advance(next) {
            debug_assert!(false, "{e}");
            warn!(error = %e, "query lifecycle violation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bq_02_identity_store::{
        EnrolledTemplate, FaultPlan, InMemoryAuditSpool, InMemoryIdentityStore,
    };
    use bq_03_matching_engine::MatchPolicy;
    use bq_04_request_protocol::encode_query_frame;
    use chrono::Utc;
    use shared_types::{IdentityId, TemplateId};

    use crate::ports::MockClock;

    const PROBE: [u8; 16] = [0x3C; 16];

    struct Harness {
        store: Arc<InMemoryIdentityStore>,
        spool: Arc<InMemoryAuditSpool>,
        orchestrator: QueryOrchestrator,
    }

    fn harness(config: OrchestratorConfig) -> Harness {
        let store = Arc::new(InMemoryIdentityStore::with_enrolled(vec![EnrolledTemplate {
            identity_id: IdentityId(42),
            template_id: TemplateId(1),
            finger: FingerPosition::IndexRight,
            template: PROBE.to_vec(),
        }]));
        let spool = Arc::new(InMemoryAuditSpool::new(100));
        let orchestrator = QueryOrchestrator::with_ports(
            config,
            store.clone(),
            spool.clone(),
            Arc::new(MockClock::new(Utc::now())),
            Arc::new(NoopMetrics),
        )
        .unwrap();
        Harness {
            store,
            spool,
            orchestrator,
        }
    }

    fn config(threshold: f64) -> OrchestratorConfig {
        OrchestratorConfig {
            unit_code: "GATE-1".to_string(),
            matching: MatchPolicy { threshold },
            ..OrchestratorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_match_grants_and_persists_audit() {
        let h = harness(config(0.8));
        let frame = encode_query_frame(&PROBE, FingerPosition::IndexRight);

        let outcome = h
            .orchestrator
            .handle_frame(frame.as_bytes(), TransportOrigin::Serial)
            .await;

        assert!(outcome.decision.granted());
        assert_eq!(outcome.response, b"YES\n");
        assert_eq!(outcome.audit, AuditStatus::Persisted);
        assert_eq!(
            outcome.lifecycle.history(),
            &[
                QueryState::Received,
                QueryState::Parsed,
                QueryState::Validated,
                QueryState::Matched,
                QueryState::Audited,
                QueryState::Responded,
            ]
        );

        let records = h.store.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].unit_code, "GATE-1");
        assert_eq!(records[0].identity_id(), Some(IdentityId(42)));
        assert_eq!(records[0].template_fingerprint, fingerprint(&PROBE));
    }

    #[tokio::test]
    async fn test_wrong_finger_is_no_match() {
        let h = harness(config(0.8));
        let frame = encode_query_frame(&PROBE, FingerPosition::IndexLeft);

        let outcome = h
            .orchestrator
            .handle_frame(frame.as_bytes(), TransportOrigin::Tcp)
            .await;

        assert_eq!(outcome.decision.reason(), DecisionReason::NoMatch);
        assert_eq!(outcome.response, b"NO:NO_MATCH\n");
        assert_eq!(h.store.audit_records().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_never_touches_store() {
        let h = harness(config(0.8));

        let outcome = h
            .orchestrator
            .handle_frame(b"HELLO", TransportOrigin::Cli)
            .await;

        assert_eq!(outcome.decision.reason(), DecisionReason::MalformedFrame);
        assert_eq!(outcome.response, b"ERROR\n");
        assert_eq!(outcome.audit, AuditStatus::Noted);
        assert_eq!(
            outcome.lifecycle.current(),
            QueryState::Failed(DecisionReason::MalformedFrame)
        );
        assert_eq!(h.store.lookup_count(), 0);
        assert_eq!(h.store.audit_attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_reject_frame_is_malformed() {
        let h = harness(config(0.8));
        let outcome = h
            .orchestrator
            .reject_frame(TransportOrigin::Tcp, "frame exceeds 8192 bytes");
        assert_eq!(outcome.response, b"ERROR:MALFORMED_FRAME\n");
        assert_eq!(h.store.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_rejection_notes_can_be_disabled() {
        let h = harness(OrchestratorConfig {
            audit_rejections: false,
            ..config(0.8)
        });
        let outcome = h
            .orchestrator
            .handle_frame(b"QUERY:%%%:index_right", TransportOrigin::Serial)
            .await;
        assert_eq!(outcome.audit, AuditStatus::Skipped);
        assert_eq!(outcome.audit_id, None);
    }

    #[tokio::test]
    async fn test_store_error_fails_closed() {
        let h = harness(config(0.8));
        h.store.set_faults(FaultPlan {
            fail_lookups: true,
            ..FaultPlan::default()
        });
        let frame = encode_query_frame(&PROBE, FingerPosition::IndexRight);

        let outcome = h
            .orchestrator
            .handle_frame(frame.as_bytes(), TransportOrigin::Serial)
            .await;

        assert!(!outcome.decision.granted());
        assert_eq!(outcome.decision.reason(), DecisionReason::StoreError);
        assert_eq!(outcome.response, b"NO\n");
        // The denial itself is still audited.
        h.orchestrator.audit_pipeline().flush().await;
        assert_eq!(h.store.audit_records().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_times_out_before_deadline() {
        let h = harness(OrchestratorConfig {
            deadline: Duration::from_millis(100),
            ..config(0.8)
        });
        h.store.set_faults(FaultPlan {
            lookup_delay: Some(Duration::from_millis(500)),
            ..FaultPlan::default()
        });
        let frame = encode_query_frame(&PROBE, FingerPosition::IndexRight);

        let started = Instant::now();
        let outcome = h
            .orchestrator
            .handle_frame(frame.as_bytes(), TransportOrigin::Serial)
            .await;

        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(outcome.decision.reason(), DecisionReason::Timeout);
        assert_eq!(outcome.response, b"NO\n");

        h.orchestrator.audit_pipeline().flush().await;
        let records = h.store.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].decision.reason(), DecisionReason::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_audit_does_not_change_decision() {
        let h = harness(OrchestratorConfig {
            deadline: Duration::from_millis(100),
            ..config(0.8)
        });
        h.store.set_faults(FaultPlan {
            audit_delay: Some(Duration::from_millis(300)),
            ..FaultPlan::default()
        });
        let frame = encode_query_frame(&PROBE, FingerPosition::IndexRight);

        let outcome = h
            .orchestrator
            .handle_frame(frame.as_bytes(), TransportOrigin::Serial)
            .await;

        assert!(outcome.decision.granted());
        assert_eq!(outcome.audit, AuditStatus::InFlight);
        assert_eq!(outcome.lifecycle.current(), QueryState::Responded);
        assert!(!outcome.lifecycle.history().contains(&QueryState::Audited));

        h.orchestrator.audit_pipeline().flush().await;
        assert_eq!(h.store.audit_records().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_audit_is_spooled_and_response_unchanged() {
        let h = harness(config(0.8));
        h.store.set_faults(FaultPlan {
            failing_audit_appends: 1,
            ..FaultPlan::default()
        });
        let frame = encode_query_frame(&PROBE, FingerPosition::IndexRight);

        let outcome = h
            .orchestrator
            .handle_frame(frame.as_bytes(), TransportOrigin::Serial)
            .await;

        assert_eq!(outcome.response, b"YES\n");
        assert_eq!(outcome.audit, AuditStatus::Spooled);
        assert_eq!(h.spool.depth().unwrap(), 1);
        let spooled = h.spool.pending();
        assert_eq!(Some(spooled[0].record.audit_id), outcome.audit_id);
    }
}
