//! # Integration Tests
//!
//! End-to-end flows through the orchestrator with a scripted identity store.

pub mod audit_durability;
pub mod concurrency;
pub mod scenarios;
