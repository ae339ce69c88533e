//! # Access Query Benchmarks
//!
//! Latency of the pieces on the request path:
//!
//! | Stage | Crate | Target |
//! |-------|-------|--------|
//! | Frame parse + decode | bq-04 / bq-01 | < 10µs |
//! | Candidate evaluation | bq-03 | < 50µs for 1k candidates |
//! | Full request, in-memory store | bq-05 | < 1ms |

use std::sync::Arc;

use bq_01_template_codec::{CodecLimits, TemplateCodec};
use bq_02_identity_store::{EnrolledTemplate, InMemoryAuditSpool, InMemoryIdentityStore};
use bq_03_matching_engine::{MatchPolicy, MatchingEngine};
use bq_04_request_protocol::{encode_query_frame, parse_frame};
use bq_05_query_orchestrator::{OrchestratorConfig, QueryOrchestrator};
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::{FingerPosition, IdentityId, MatchCandidate, TemplateId, TransportOrigin};

const FINGERS: [FingerPosition; 10] = [
    FingerPosition::ThumbRight,
    FingerPosition::IndexRight,
    FingerPosition::MiddleRight,
    FingerPosition::RingRight,
    FingerPosition::PinkyRight,
    FingerPosition::ThumbLeft,
    FingerPosition::IndexLeft,
    FingerPosition::MiddleLeft,
    FingerPosition::RingLeft,
    FingerPosition::PinkyLeft,
];

fn template(seed: u8) -> Vec<u8> {
    (0..512u32)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

fn bench_parse_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("bq-04-parse-frame");
    let codec = TemplateCodec::new(CodecLimits::default());
    let frame = encode_query_frame(&template(7), FingerPosition::IndexRight);

    group.throughput(Throughput::Bytes(frame.len() as u64));
    group.bench_function("query_512_byte_template", |b| {
        b.iter(|| {
            black_box(
                parse_frame(
                    black_box(frame.as_bytes()),
                    TransportOrigin::Serial,
                    Utc::now(),
                    &codec,
                )
                .is_ok(),
            )
        })
    });
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("bq-03-evaluate");
    let engine = MatchingEngine::new(MatchPolicy::default()).expect("default policy");

    for size in [10usize, 100, 1_000] {
        let candidates: Vec<MatchCandidate> = (0..size)
            .map(|i| {
                MatchCandidate::new(
                    IdentityId(i as i64),
                    TemplateId(i as i64),
                    (i % 100) as f64 / 100.0,
                    FINGERS[i % FINGERS.len()],
                )
                .expect("score in range")
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("candidates", size), &candidates, |b, c| {
            b.iter(|| black_box(engine.decide(c, FingerPosition::IndexRight, Utc::now())))
        });
    }
    group.finish();
}

fn bench_handle_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("bq-05-handle-frame");
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");

    let enrolled: Vec<EnrolledTemplate> = (0..200u8)
        .map(|seed| EnrolledTemplate {
            identity_id: IdentityId(i64::from(seed)),
            template_id: TemplateId(i64::from(seed)),
            finger: FINGERS[usize::from(seed) % FINGERS.len()],
            template: template(seed),
        })
        .collect();
    let orchestrator = QueryOrchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(InMemoryIdentityStore::with_enrolled(enrolled)),
        Arc::new(InMemoryAuditSpool::new(10_000)),
    )
    .expect("default config");

    // Seed 1 is enrolled on index_right.
    let frame = encode_query_frame(&template(1), FingerPosition::IndexRight).into_bytes();
    group.bench_function("grant_200_enrolled", |b| {
        b.iter(|| {
            runtime.block_on(async {
                black_box(orchestrator.handle_frame(&frame, TransportOrigin::Tcp).await)
            })
        })
    });
    group.finish();
}

criterion_group!(benches, bench_parse_frame, bench_evaluate, bench_handle_frame);
criterion_main!(benches);
