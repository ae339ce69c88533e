//! # Identity Store Gateway
//!
//! **Component:** bq-02
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! The narrow contract between the access query engine and the external
//! identity database: one read (template to scored candidates) and one write
//! (append an audit record). Also owns the local audit spool that keeps audit
//! records durable while the store refuses writes.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Candidate scores lie in `[0, 1]` | `domain/similarity.rs` - `similarity()`, `MatchCandidate::new()` |
//! | Audit append is idempotent on `audit_id` | `adapters/postgres.rs` - `ON CONFLICT DO NOTHING`, `adapters/memory.rs` |
//! | Spool appends are fsynced before returning | `adapters/spool/file.rs` - `append_lines()` |
//! | Spool files are only touched under the spool lock | `adapters/spool/lock.rs` - `SpoolLock` |
//! | Spooled records are never silently dropped | `adapters/spool/file.rs` - dead letter and corrupt files |
//!
//! ## Audit Retry Flow
//!
//! ```text
//! append_audit ──ok──→ [PERSISTED]
//!      │
//!      └── err ──→ enqueue ──→ [SPOOLED] ──take_batch──→ [CLAIMED]
//!                                  ↑                        │
//!                                  └──── complete(retry) ───┤ append ok → [PERSISTED]
//!                                                           └ attempts ≥ max → [DEAD LETTER]
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/postgres.rs  - PostgresIdentityStore (sqlx PgPool)    │
//! │  adapters/memory.rs    - InMemoryIdentityStore (fault knobs)    │
//! │  adapters/spool/       - FileAuditSpool, InMemoryAuditSpool     │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/outbound.rs - IdentityStore, AuditSpool traits           │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/similarity.rs - bitwise template similarity             │
//! │  domain/entities.rs   - EnrolledTemplate, SpooledAudit          │
//! │  domain/errors.rs     - StoreError, SpoolError                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
