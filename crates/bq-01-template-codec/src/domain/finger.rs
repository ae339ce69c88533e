//! Finger position registry.
//!
//! The registry is the closed set of ten positions in
//! [`FingerPosition::ALL`]. Tokens are compared byte for byte: no case
//! folding, no trimming, no aliases.

use shared_types::{FingerPosition, UnknownFingerError};

/// Validates a wire finger token.
pub fn normalize(token: &str) -> Result<FingerPosition, UnknownFingerError> {
    token.parse()
}

/// The ten accepted tokens, right hand first.
pub fn canonical_tokens() -> impl Iterator<Item = &'static str> {
    FingerPosition::ALL.into_iter().map(|finger| finger.as_str())
}
