//! # Ports Layer
//!
//! - `outbound`: Clock, QueryMetrics

pub mod outbound;

pub use outbound::*;
