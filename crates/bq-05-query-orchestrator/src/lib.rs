//! # Query Orchestrator
//!
//! **Component:** bq-05
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Drives one access query from raw frame bytes to response bytes. It is the
//! only component that enforces the end-to-end deadline and the only one
//! that starts audit writes, so every transport gets the same guarantees.
//!
//! ## Request Lifecycle
//!
//! ```text
//! [RECEIVED] ──split──→ [PARSED] ──validate──→ [VALIDATED] ──lookup+decide──→ [MATCHED]
//!     │                    │                       │                             │
//!     │                    │                       │                  append ok  │  append failed
//!     │                    │                       │                      ↓      │  (spooled)
//!     │                    │                       │                 [AUDITED]   │
//!     │                    │                       │                      ↓      ↓
//!     │                    │                       │                    [RESPONDED]
//!     ↓                    ↓                       ↓
//! FAILED(MALFORMED)   FAILED(INVALID_*)    FAILED(STORE_ERROR | TIMEOUT)
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Every request yields exactly one decision and one response | `service.rs` - `handle_frame()` |
//! | Rejected input never reaches the store | `service.rs` - `reject()` |
//! | Deadline bounds lookup and audit wait; a late lookup denies with `TIMEOUT` | `service.rs` - `timeout_at` |
//! | A late audit never changes the decision | `service.rs` - `await_audit()` |
//! | Every validated request has exactly one audit record, eventually | `audit.rs` - `AuditPipeline` |
//! | Audit retries reuse `audit_id` | `audit.rs` - `replay_spooled()` |
//!
//! ## Outbound Dependencies
//!
//! | Component | Trait | Purpose |
//! |-----------|-------|---------|
//! | bq-02 | `IdentityStore` | Candidate lookup, audit append |
//! | bq-02 | `AuditSpool` | Durable fallback for failed audit appends |
//! | - | `Clock` | Decision and audit timestamps |
//! | - | `QueryMetrics` | Decision, lookup and audit counters |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service.rs - QueryOrchestrator (handle_frame)                  │
//! │  audit.rs   - AuditPipeline (commit, flush, replay, retry loop) │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - Clock, QueryMetrics                        │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/lifecycle.rs - QueryState, QueryLifecycle               │
//! │  domain/config.rs    - OrchestratorConfig                       │
//! │  domain/outcome.rs   - QueryOutcome, AuditStatus, ReplayReport  │
//! │  domain/errors.rs    - OrchestratorError                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod domain;
pub mod ports;
pub mod service;

pub use audit::{AuditHandle, AuditPipeline};
pub use domain::*;
pub use ports::*;
pub use service::QueryOrchestrator;
