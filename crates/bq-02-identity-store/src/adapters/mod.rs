//! # Adapters Layer
//!
//! - `memory`: in-process identity store with fault injection
//! - `postgres`: sqlx-backed identity store (feature `postgres`)
//! - `spool`: file and in-memory audit spools

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod spool;

pub use memory::*;
#[cfg(feature = "postgres")]
pub use postgres::*;
pub use spool::*;
