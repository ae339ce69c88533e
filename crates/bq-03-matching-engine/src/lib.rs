//! # Matching Engine
//!
//! **Component:** bq-03
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Turns the scored candidates returned by the identity store into exactly
//! one [`shared_types::Decision`]. The engine is pure: no I/O, no clock, no
//! randomness. The same candidates and claimed finger always produce the same
//! decision, whatever order the store returned them in.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Only candidates enrolled on the claimed finger are considered | `domain/engine.rs` - `evaluate()` filter |
//! | Highest score wins, ties go to the lowest template id | `domain/engine.rs` - `outranks()` |
//! | Grant only when best score >= threshold | `domain/engine.rs` - `evaluate()` |
//! | Threshold lies in `(0, 1]` | `domain/policy.rs` - `MatchPolicy::validate()` |
//!
//! ## Decision Table
//!
//! | Same-finger candidates | Best score | Reason | Granted |
//! |------------------------|------------|--------|---------|
//! | none | - | `NO_MATCH` | no |
//! | some | `< threshold` | `NO_MATCH` | no |
//! | some | `>= threshold` | `MATCH` | yes |

pub mod domain;

pub use domain::*;
