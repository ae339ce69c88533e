//! # Audit Durability
//!
//! Every request that passed validation ends with exactly one persisted
//! audit record, even across store outages and process restarts.
//!
//! ```text
//! handle_frame ──append fails──→ FileAuditSpool ──(restart)──→ replay ──→ store
//!                                      │
//!                                      └──attempts exhausted──→ dead letter
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bq_02_identity_store::{AuditSpool, FileAuditSpool};
    use bq_05_query_orchestrator::{AuditStatus, OrchestratorConfig};
    use shared_types::{DecisionReason, FingerPosition, TransportOrigin};

    use crate::fixtures::{candidate, config, probe_frame, with_spool, ScriptedIdentityStore};

    fn store() -> Arc<ScriptedIdentityStore> {
        Arc::new(ScriptedIdentityStore::new(vec![candidate(
            7,
            70,
            0.97,
            FingerPosition::ThumbRight,
        )]))
    }

    fn durable_config() -> OrchestratorConfig {
        config(0.80, Duration::from_secs(3))
    }

    #[tokio::test]
    async fn test_spooled_record_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        store.fail_appends(1);

        let audit_id = {
            let spool = Arc::new(FileAuditSpool::open(dir.path(), 100).unwrap());
            let orchestrator = with_spool(store.clone(), durable_config(), spool.clone());
            let outcome = orchestrator
                .handle_frame(&probe_frame(FingerPosition::ThumbRight), TransportOrigin::Serial)
                .await;

            // The decision stands while the audit sits in the spool.
            assert_eq!(outcome.response, b"YES\n");
            assert_eq!(outcome.audit, AuditStatus::Spooled);
            orchestrator.audit_pipeline().flush().await;
            assert_eq!(spool.depth().unwrap(), 1);
            outcome.audit_id.unwrap()
        };
        assert!(store.audit_records().is_empty());

        // A fresh process over the same directory.
        let spool = Arc::new(FileAuditSpool::open(dir.path(), 100).unwrap());
        let orchestrator = with_spool(store.clone(), durable_config(), spool.clone());
        let report = orchestrator.audit_pipeline().replay_spooled().await.unwrap();

        assert_eq!(report.persisted, 1);
        assert_eq!(spool.depth().unwrap(), 0);
        let records = store.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].audit_id, audit_id);
    }

    #[tokio::test]
    async fn test_replaying_twice_persists_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        store.fail_appends(1);
        let spool = Arc::new(FileAuditSpool::open(dir.path(), 100).unwrap());
        let orchestrator = with_spool(store.clone(), durable_config(), spool);

        orchestrator
            .handle_frame(&probe_frame(FingerPosition::ThumbLeft), TransportOrigin::Tcp)
            .await;
        orchestrator.audit_pipeline().flush().await;

        let first = orchestrator.audit_pipeline().replay_spooled().await.unwrap();
        let second = orchestrator.audit_pipeline().replay_spooled().await.unwrap();
        assert_eq!(first.persisted, 1);
        assert!(second.is_empty());

        let records = store.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].decision.reason(), DecisionReason::NoMatch);
    }

    #[tokio::test]
    async fn test_exhausted_record_is_dead_lettered() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        store.fail_appends(u32::MAX);
        let spool = Arc::new(FileAuditSpool::open(dir.path(), 100).unwrap());
        let config = OrchestratorConfig {
            max_audit_attempts: 3,
            ..durable_config()
        };
        let orchestrator = with_spool(store.clone(), config, spool.clone());

        orchestrator
            .handle_frame(&probe_frame(FingerPosition::ThumbRight), TransportOrigin::Serial)
            .await;
        orchestrator.audit_pipeline().flush().await;

        // Attempt 1 was the original append; two replays use up the budget.
        let pipeline = orchestrator.audit_pipeline();
        assert_eq!(pipeline.replay_spooled().await.unwrap().requeued, 1);
        assert_eq!(pipeline.replay_spooled().await.unwrap().dead_lettered, 1);

        assert_eq!(spool.depth().unwrap(), 0);
        assert_eq!(spool.dead_letter_depth().unwrap(), 1);
        assert_eq!(store.append_attempts(), 3);
        assert!(store.audit_records().is_empty());
    }

    #[tokio::test]
    async fn test_every_validated_request_is_audited_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        // The first three appends fail.
        store.fail_appends(3);
        let spool = Arc::new(FileAuditSpool::open(dir.path(), 100).unwrap());
        let orchestrator = with_spool(store.clone(), durable_config(), spool);

        let mut audit_ids = Vec::new();
        for finger in [
            FingerPosition::ThumbRight,
            FingerPosition::IndexRight,
            FingerPosition::ThumbRight,
            FingerPosition::PinkyLeft,
            FingerPosition::ThumbRight,
            FingerPosition::RingLeft,
        ] {
            let outcome = orchestrator
                .handle_frame(&probe_frame(finger), TransportOrigin::Serial)
                .await;
            audit_ids.push(outcome.audit_id.unwrap());
        }
        // Rejected input is noted, never stored.
        let rejected = orchestrator
            .handle_frame(b"QUERY:!!:thumb_right", TransportOrigin::Serial)
            .await;
        assert_eq!(rejected.audit, AuditStatus::Noted);

        orchestrator.audit_pipeline().flush().await;
        orchestrator.audit_pipeline().replay_spooled().await.unwrap();

        let mut stored: Vec<_> = store.audit_records().iter().map(|r| r.audit_id).collect();
        stored.sort_by_key(|id| id.to_string());
        audit_ids.sort_by_key(|id| id.to_string());
        assert_eq!(stored, audit_ids);
    }
}
