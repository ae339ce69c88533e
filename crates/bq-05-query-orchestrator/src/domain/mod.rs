//! # Domain Layer - Query Orchestrator
//!
//! - `lifecycle`: per-request state machine
//! - `config`: deadlines, audit policy, codec and matching settings
//! - `outcome`: what a handled request returns
//! - `errors`: OrchestratorError

pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod outcome;

pub use config::*;
pub use errors::*;
pub use lifecycle::*;
pub use outcome::*;
