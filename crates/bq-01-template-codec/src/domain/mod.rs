//! # Domain Layer - Template Codec
//!
//! ## Components
//!
//! - `codec`: base64 decoding with size limits
//! - `finger`: the finger position registry
//! - `fingerprint`: one-way template digest for audit and logs
//! - `errors`: CodecError enumeration

pub mod codec;
pub mod errors;
pub mod finger;
pub mod fingerprint;

pub use codec::*;
pub use errors::*;
pub use finger::*;
pub use fingerprint::*;
