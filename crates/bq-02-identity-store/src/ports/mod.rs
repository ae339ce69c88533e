//! # Ports Layer
//!
//! - `outbound`: IdentityStore, AuditSpool (driven by the query orchestrator)

pub mod outbound;

pub use outbound::*;
