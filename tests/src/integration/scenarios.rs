//! # Acceptance Scenarios
//!
//! | Scenario | Input | Expected |
//! |----------|-------|----------|
//! | A | 16-byte probe, candidate at 0.92, threshold 0.80 | `YES`, audit granted |
//! | B | same, threshold 0.95 | `NO`, audit `NO_MATCH` |
//! | C | `QUERY:not-base64:index_right` | `ERROR`, store untouched, audit note |
//! | D | finger `invalid_finger` | `ERROR`/`INVALID_FINGER`, store untouched |
//! | E | lookup slower than the deadline | `NO`/`TIMEOUT` on time, audit afterwards |

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bq_01_template_codec::TemplateCodec;
    use bq_04_request_protocol::{parse_response, ResponseToken, QUERY_KEYWORD};
    use bq_05_query_orchestrator::{AuditStatus, QueryState};
    use shared_types::{DecisionReason, FingerPosition, IdentityId, TransportOrigin};

    use crate::fixtures::{candidate, config, orchestrator, probe_frame, ScriptedIdentityStore, PROBE};

    const DEADLINE: Duration = Duration::from_secs(3);

    fn one_candidate() -> Arc<ScriptedIdentityStore> {
        Arc::new(ScriptedIdentityStore::new(vec![candidate(
            42,
            4201,
            0.92,
            FingerPosition::IndexRight,
        )]))
    }

    // =========================================================================
    // SCENARIOS A-B: THRESHOLD
    // =========================================================================

    #[tokio::test]
    async fn test_scenario_a_grant_above_threshold() {
        let store = one_candidate();
        let (orchestrator, _) = orchestrator(store.clone(), config(0.80, DEADLINE));

        let outcome = orchestrator
            .handle_frame(&probe_frame(FingerPosition::IndexRight), TransportOrigin::Serial)
            .await;

        assert_eq!(outcome.response, b"YES\n");
        assert_eq!(outcome.audit, AuditStatus::Persisted);
        assert_eq!(
            outcome.lifecycle.history().last(),
            Some(&QueryState::Responded)
        );

        let records = store.audit_records();
        assert_eq!(records.len(), 1);
        assert!(records[0].decision.granted());
        assert_eq!(records[0].decision.identity_id(), Some(IdentityId(42)));
        assert_eq!(records[0].decision.score_used(), Some(0.92));
        assert_eq!(records[0].claimed_finger, Some(FingerPosition::IndexRight));
        assert_eq!(records[0].unit_code, "TEST-GATE");
    }

    #[tokio::test]
    async fn test_scenario_b_deny_below_threshold() {
        let store = one_candidate();
        let (orchestrator, _) = orchestrator(store.clone(), config(0.95, DEADLINE));

        let outcome = orchestrator
            .handle_frame(&probe_frame(FingerPosition::IndexRight), TransportOrigin::Serial)
            .await;

        assert_eq!(outcome.response, b"NO\n");
        let records = store.audit_records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].decision.granted());
        assert_eq!(records[0].decision.reason(), DecisionReason::NoMatch);
        assert_eq!(records[0].decision.identity_id(), None);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let store = one_candidate();
        let (orchestrator, _) = orchestrator(store, config(0.92, DEADLINE));

        let outcome = orchestrator
            .handle_frame(&probe_frame(FingerPosition::IndexRight), TransportOrigin::Tcp)
            .await;
        assert_eq!(outcome.response, b"YES:MATCH\n");
    }

    // =========================================================================
    // SCENARIOS C-D: REJECTED INPUT
    // =========================================================================

    #[tokio::test]
    async fn test_scenario_c_bad_base64_never_reaches_store() {
        let store = one_candidate();
        let (orchestrator, _) = orchestrator(store.clone(), config(0.80, DEADLINE));

        let outcome = orchestrator
            .handle_frame(b"QUERY:not-base64:index_right\n", TransportOrigin::Serial)
            .await;

        assert_eq!(outcome.response, b"ERROR\n");
        assert_eq!(outcome.decision.reason(), DecisionReason::InvalidTemplate);
        assert_eq!(outcome.audit, AuditStatus::Noted);
        assert_eq!(store.interactions(), 0);
        assert!(store.audit_records().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_d_unknown_finger_never_reaches_store() {
        let store = one_candidate();
        let (orchestrator, _) = orchestrator(store.clone(), config(0.80, DEADLINE));
        let frame = format!(
            "{QUERY_KEYWORD}:{}:invalid_finger",
            TemplateCodec::encode(&PROBE)
        );

        let outcome = orchestrator
            .handle_frame(frame.as_bytes(), TransportOrigin::Tcp)
            .await;

        assert_eq!(outcome.response, b"ERROR:INVALID_FINGER\n");
        assert_eq!(store.interactions(), 0);
    }

    #[tokio::test]
    async fn test_wrong_finger_is_no_match_despite_high_score() {
        let store = Arc::new(ScriptedIdentityStore::new(vec![candidate(
            42,
            4201,
            1.0,
            FingerPosition::ThumbLeft,
        )]));
        let (orchestrator, _) = orchestrator(store.clone(), config(0.80, DEADLINE));

        let outcome = orchestrator
            .handle_frame(&probe_frame(FingerPosition::IndexRight), TransportOrigin::Tcp)
            .await;

        assert_eq!(outcome.response, b"NO:NO_MATCH\n");
        assert_eq!(store.lookups(), 1);
    }

    // =========================================================================
    // SCENARIO E: DEADLINE
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_scenario_e_slow_lookup_times_out_on_schedule() {
        let deadline = Duration::from_millis(250);
        let store = one_candidate();
        store.set_lookup_delay(Duration::from_secs(30));
        let (orchestrator, _) = orchestrator(store.clone(), config(0.80, deadline));

        let started = tokio::time::Instant::now();
        let outcome = orchestrator
            .handle_frame(&probe_frame(FingerPosition::IndexRight), TransportOrigin::Serial)
            .await;
        let elapsed = started.elapsed();

        assert_eq!(outcome.response, b"NO\n");
        assert_eq!(outcome.decision.reason(), DecisionReason::Timeout);
        assert!(elapsed <= deadline + Duration::from_millis(50), "took {elapsed:?}");

        // The audit write is attempted after the response.
        orchestrator.audit_pipeline().flush().await;
        let records = store.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].decision.reason(), DecisionReason::Timeout);
    }

    // =========================================================================
    // TIE-BREAKING AND ROUND TRIP
    // =========================================================================

    #[tokio::test]
    async fn test_ties_resolve_to_lowest_template_id_in_any_order() {
        let a = candidate(1, 30, 0.9, FingerPosition::IndexRight);
        let b = candidate(2, 10, 0.9, FingerPosition::IndexRight);
        let c = candidate(3, 20, 0.9, FingerPosition::IndexRight);

        for order in [
            vec![a.clone(), b.clone(), c.clone()],
            vec![c.clone(), a.clone(), b.clone()],
            vec![b.clone(), c.clone(), a.clone()],
        ] {
            let store = Arc::new(ScriptedIdentityStore::new(order));
            let (orchestrator, _) = orchestrator(store, config(0.80, DEADLINE));
            let outcome = orchestrator
                .handle_frame(&probe_frame(FingerPosition::IndexRight), TransportOrigin::Cli)
                .await;
            assert_eq!(outcome.decision.identity_id(), Some(IdentityId(2)));
        }
    }

    #[tokio::test]
    async fn test_parsed_response_agrees_with_decision() {
        let store = one_candidate();
        let (orchestrator, _) = orchestrator(store, config(0.80, DEADLINE));

        for (frame, origin) in [
            (probe_frame(FingerPosition::IndexRight), TransportOrigin::Tcp),
            (probe_frame(FingerPosition::IndexLeft), TransportOrigin::Serial),
            (b"QUERY:".to_vec(), TransportOrigin::Tcp),
        ] {
            let outcome = orchestrator.handle_frame(&frame, origin).await;
            let parsed = parse_response(&outcome.response).unwrap();
            assert_eq!(parsed.granted(), outcome.decision.granted());
            assert_eq!(
                parsed.token,
                ResponseToken::for_decision(&outcome.decision)
            );
        }
    }
}
