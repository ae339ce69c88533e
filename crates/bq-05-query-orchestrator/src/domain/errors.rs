use bq_01_template_codec::CodecError;
use bq_03_matching_engine::MatchPolicyError;
use thiserror::Error;

/// Orchestrator construction errors. Request handling itself never fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    #[error("Invalid orchestrator configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Policy(#[from] MatchPolicyError),
}
