//! # Domain Layer - Matching Engine
//!
//! - `policy`: MatchPolicy (acceptance threshold)
//! - `engine`: MatchingEngine, MatchEvaluation
//! - `errors`: MatchPolicyError

pub mod engine;
pub mod errors;
pub mod policy;

pub use engine::*;
pub use errors::*;
pub use policy::*;
