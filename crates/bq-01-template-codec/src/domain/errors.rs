//! Codec error types.

use thiserror::Error;

/// Reasons a template token is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Template token is empty")]
    Empty,

    #[error("Template is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("Template too short: {len} bytes, minimum {min}")]
    TooShort { len: usize, min: usize },

    #[error("Template too large: {len} bytes, maximum {max}")]
    TooLarge { len: usize, max: usize },

    /// Raised by [`crate::CodecLimits::validate`], never by decoding.
    #[error("Invalid codec limits: {0}")]
    InvalidLimits(String),
}
