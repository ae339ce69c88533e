//! # Biometric Access Test Suite
//!
//! Workspace-level tests that drive the engine through
//! `QueryOrchestrator::handle_frame`, the same entry point every transport
//! uses.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs           # Scripted identity store, frames, harness
//! │   └── integration/
//! │       ├── scenarios.rs      # Acceptance scenarios A-E and tie-breaking
//! │       ├── audit_durability.rs # Spool, restart, replay, dead letters
//! │       └── concurrency.rs    # Many requests against one orchestrator
//! └── benches/
//!     └── access_benchmarks.rs  # Parse, match and full-request latency
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p bq-tests
//!
//! # By category
//! cargo test -p bq-tests integration::scenarios
//! cargo test -p bq-tests integration::audit_durability
//!
//! # Benchmarks
//! cargo bench -p bq-tests
//! ```

pub mod fixtures;
pub mod integration;
