//! # Template Codec & Finger Position Registry
//!
//! **Component:** bq-01
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Turns the two untrusted text fields of a query frame into domain values:
//! the base64 template token into a bounded [`shared_types::Template`], and the
//! finger token into one of the ten [`shared_types::FingerPosition`]s. Also
//! derives the short fingerprint that stands in for a template in every log
//! line and audit record.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Strict standard base64, no whitespace | `domain/codec.rs` - `TemplateCodec::decode()` |
//! | Decoded length within `[min, max]` | `domain/codec.rs` - `TemplateCodec::decode()` |
//! | Finger tokens matched exactly, closed set of ten | `domain/finger.rs` - `normalize()` |
//! | Fingerprint is a truncated one-way digest | `domain/fingerprint.rs` - `fingerprint()` |
//!
//! ## Module Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER (pure)                         │
//! │  domain/codec.rs       - TemplateCodec, CodecLimits             │
//! │  domain/finger.rs      - normalize(), canonical_tokens()        │
//! │  domain/fingerprint.rs - fingerprint()                          │
//! │  domain/errors.rs      - CodecError                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod domain;

pub use domain::*;
