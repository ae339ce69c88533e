//! # Domain Layer - Request Protocol
//!
//! - `frame`: request frame splitting and validation
//! - `response`: response serialization and the reference client parser
//! - `errors`: ParseError

pub mod errors;
pub mod frame;
pub mod response;

pub use errors::*;
pub use frame::*;
pub use response::*;
