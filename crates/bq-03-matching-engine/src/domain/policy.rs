//! Acceptance policy.

use serde::{Deserialize, Serialize};

use super::errors::MatchPolicyError;

/// Conservative default: a false accept opens a door.
pub const DEFAULT_THRESHOLD: f64 = 0.90;

/// Matching configuration, read once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Minimum similarity required to grant.
    pub threshold: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl MatchPolicy {
    pub fn new(threshold: f64) -> Result<Self, MatchPolicyError> {
        let policy = Self { threshold };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), MatchPolicyError> {
        // NaN fails both comparisons and is rejected here as well.
        if self.threshold > 0.0 && self.threshold <= 1.0 {
            Ok(())
        } else {
            Err(MatchPolicyError::ThresholdOutOfRange {
                threshold: self.threshold,
            })
        }
    }
}
