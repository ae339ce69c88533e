//! # Error Types
//!
//! Construction errors for the shared entities.

use thiserror::Error;

/// A finger token outside the closed set of ten canonical positions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown finger position: {token:?}")]
pub struct UnknownFingerError {
    /// The rejected token, verbatim.
    pub token: String,
}

/// Errors raised when building a [`crate::MatchCandidate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandidateError {
    /// Similarity scores are normalized to `[0, 1]`.
    #[error("Candidate score {score} outside [0, 1]")]
    ScoreOutOfRange { score: f64 },

    /// NaN and infinities never compare sensibly.
    #[error("Candidate score is not finite")]
    NonFiniteScore,
}

/// A template must carry at least one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Template is empty")]
pub struct EmptyTemplateError;

/// A stored decision whose fields contradict each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecisionError {
    /// `granted` must be true exactly when the reason is `MATCH`.
    #[error("Decision granted={granted} contradicts reason {reason}")]
    GrantMismatch {
        granted: bool,
        reason: crate::DecisionReason,
    },

    /// A grant names its identity; a denial never does.
    #[error("Decision granted={granted} with identity present={identity}")]
    IdentityMismatch { granted: bool, identity: bool },
}
