//! # Concurrency
//!
//! One orchestrator is shared by every transport task. Requests on separate
//! tasks must not see each other's state, and a slow store must not hold up
//! rejected input.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use shared_types::{DecisionReason, FingerPosition, IdentityId, TransportOrigin};
    use tokio::task::JoinSet;

    use crate::fixtures::{candidate, config, orchestrator, probe_frame, ScriptedIdentityStore};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_requests_get_independent_decisions() {
        let store = Arc::new(ScriptedIdentityStore::new(vec![
            candidate(1, 11, 0.95, FingerPosition::IndexRight),
            candidate(2, 22, 0.95, FingerPosition::ThumbLeft),
        ]));
        let (orchestrator, _) = orchestrator(store.clone(), config(0.80, Duration::from_secs(5)));

        let mut tasks = JoinSet::new();
        for i in 0..64 {
            let orchestrator = orchestrator.clone();
            let finger = match i % 3 {
                0 => FingerPosition::IndexRight,
                1 => FingerPosition::ThumbLeft,
                _ => FingerPosition::RingLeft,
            };
            tasks.spawn(async move {
                let outcome = orchestrator
                    .handle_frame(&probe_frame(finger), TransportOrigin::Tcp)
                    .await;
                (finger, outcome)
            });
        }

        let mut audit_ids = HashSet::new();
        while let Some(joined) = tasks.join_next().await {
            let (finger, outcome) = joined.unwrap();
            let expected = match finger {
                FingerPosition::IndexRight => Some(IdentityId(1)),
                FingerPosition::ThumbLeft => Some(IdentityId(2)),
                _ => None,
            };
            assert_eq!(outcome.decision.identity_id(), expected);
            assert!(audit_ids.insert(outcome.audit_id.unwrap()));
        }

        orchestrator.audit_pipeline().flush().await;
        assert_eq!(store.audit_records().len(), 64);
        assert_eq!(store.lookups(), 64);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_does_not_delay_rejections() {
        let store = Arc::new(ScriptedIdentityStore::new(vec![]));
        store.set_lookup_delay(Duration::from_secs(2));
        let (orchestrator, _) = orchestrator(store.clone(), config(0.80, Duration::from_secs(3)));

        let slow = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .handle_frame(&probe_frame(FingerPosition::IndexRight), TransportOrigin::Serial)
                    .await
            })
        };
        tokio::task::yield_now().await;

        let started = tokio::time::Instant::now();
        let rejected = orchestrator
            .handle_frame(b"QUERY:AAAA", TransportOrigin::Serial)
            .await;
        assert_eq!(rejected.decision.reason(), DecisionReason::MalformedFrame);
        assert!(started.elapsed() < Duration::from_millis(10));

        let slow = slow.await.unwrap();
        assert_eq!(slow.decision.reason(), DecisionReason::NoMatch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failures_fail_closed_under_load() {
        let store = Arc::new(ScriptedIdentityStore::new(vec![candidate(
            5,
            50,
            1.0,
            FingerPosition::IndexRight,
        )]));
        store.fail_lookups(8);
        let (orchestrator, _) = orchestrator(store.clone(), config(0.80, Duration::from_secs(3)));

        let mut tasks = JoinSet::new();
        for _ in 0..16 {
            let orchestrator = orchestrator.clone();
            tasks.spawn(async move {
                orchestrator
                    .handle_frame(&probe_frame(FingerPosition::IndexRight), TransportOrigin::Serial)
                    .await
            });
        }

        let mut granted = 0;
        let mut store_errors = 0;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap();
            match outcome.decision.reason() {
                DecisionReason::Match => granted += 1,
                DecisionReason::StoreError => {
                    assert_eq!(outcome.response, b"NO\n");
                    store_errors += 1;
                }
                other => panic!("unexpected reason {other}"),
            }
        }
        assert_eq!((granted, store_errors), (8, 8));
    }
}
