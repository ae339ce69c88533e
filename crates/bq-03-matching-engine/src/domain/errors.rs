use thiserror::Error;

/// Rejected matching configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchPolicyError {
    #[error("Threshold {threshold} outside (0, 1]")]
    ThresholdOutOfRange { threshold: f64 },
}
