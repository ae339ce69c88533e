//! # Domain Layer - Identity Store Gateway
//!
//! - `entities`: EnrolledTemplate, EnrollmentFixture, SpooledAudit
//! - `similarity`: template similarity and candidate scoring
//! - `errors`: StoreError, SpoolError

pub mod entities;
pub mod errors;
pub mod similarity;

pub use entities::*;
pub use errors::*;
pub use similarity::*;
