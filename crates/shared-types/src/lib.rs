//! # Shared Types Crate
//!
//! Domain entities shared by every component of the access query engine.
//!
//! ## Design Principles
//!
//! - **Single Request Model**: CLI, serial and TCP frames all normalize into
//!   one [`QueryRequest`]; nothing downstream knows which transport it came from
//!   except through [`TransportOrigin`].
//! - **Immutable Outcomes**: [`MatchCandidate`] and [`Decision`] are validated
//!   at construction and expose no mutators.
//! - **No Raw Templates in Records**: [`AuditRecord`] only ever carries a
//!   [`TemplateFingerprint`]. [`Template`] redacts its bytes from `Debug`.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
