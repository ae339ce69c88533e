use bq_01_template_codec::CodecError;
use shared_types::DecisionReason;
use thiserror::Error;

/// Why a frame did not become a [`shared_types::QueryRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Wrong field count, empty frame or bytes that are not UTF-8.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("Invalid template encoding: {0}")]
    InvalidEncoding(#[from] CodecError),

    #[error("Invalid finger position: {0:?}")]
    InvalidFinger(String),
}

impl ParseError {
    /// Deny reason reported for this failure.
    pub fn reason(&self) -> DecisionReason {
        match self {
            ParseError::MalformedFrame(_) | ParseError::UnknownCommand(_) => {
                DecisionReason::MalformedFrame
            }
            ParseError::InvalidEncoding(_) => DecisionReason::InvalidTemplate,
            ParseError::InvalidFinger(_) => DecisionReason::InvalidFinger,
        }
    }
}
