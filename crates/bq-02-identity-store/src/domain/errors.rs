//! Store and spool error types.

use std::time::Duration;

use thiserror::Error;

/// Failures talking to the identity store.
///
/// On the read path every variant fails closed (`STORE_ERROR` deny). On the
/// write path the record is spooled instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Identity store unavailable: {0}")]
    Unavailable(String),

    #[error("Identity store timed out after {0:?}")]
    Timeout(Duration),

    #[error("Identity store query failed: {0}")]
    Query(String),

    /// A row that cannot be turned into a domain value.
    #[error("Invalid row from identity store: {0}")]
    InvalidRow(String),

    /// More enrolled rows than one lookup may score. Failing beats
    /// answering from a partial identity set.
    #[error("Identity store lookup exceeded {limit} candidates")]
    CandidateLimit { limit: u32 },

    /// Enrollment fixtures could not be loaded.
    #[error("Invalid enrollment fixture: {0}")]
    Fixture(String),
}

/// Failures of the local audit spool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpoolError {
    #[error("Spool I/O error: {0}")]
    Io(String),

    #[error("Spool lock error: {0}")]
    Lock(String),

    #[error("Spool full: {capacity} records pending")]
    Full { capacity: usize },

    #[error("Spool entry could not be encoded: {0}")]
    Encode(String),
}

impl From<std::io::Error> for SpoolError {
    fn from(e: std::io::Error) -> Self {
        SpoolError::Io(e.to_string())
    }
}
