//! # Request Protocol
//!
//! **Component:** bq-04
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Frames requests and responses for every transport. A request is one line:
//!
//! ```text
//! QUERY:<base64 template>:<finger>\n
//! ```
//!
//! A response is one line, in the style of the transport:
//!
//! | Decision | Word style (CLI, serial) | Structured style (TCP) |
//! |----------|--------------------------|------------------------|
//! | granted | `YES` | `YES:MATCH` |
//! | `NO_MATCH`, `STORE_ERROR`, `TIMEOUT` | `NO` | `NO:<REASON>` |
//! | `MALFORMED_FRAME`, `INVALID_TEMPLATE`, `INVALID_FINGER` | `ERROR` | `ERROR:<REASON>` |
//!
//! ## Parsing Stages
//!
//! ```text
//! raw bytes ──split_frame──→ FrameFields ──validate_fields──→ QueryRequest
//!               │                               │
//!               ├ MalformedFrame                ├ InvalidEncoding
//!               └ UnknownCommand                └ InvalidFinger
//! ```
//!
//! Parsing is pure. Nothing here touches the identity store.

pub mod domain;

pub use domain::*;
