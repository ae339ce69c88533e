//! Orchestrator configuration.

use std::time::Duration;

use bq_01_template_codec::CodecLimits;
use bq_03_matching_engine::MatchPolicy;

use super::errors::OrchestratorError;

/// Default end-to-end deadline. Gate controllers give up after a few seconds.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(3);

/// Default bound on a single audit append.
pub const DEFAULT_AUDIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default total append attempts before a record is dead-lettered.
pub const DEFAULT_MAX_AUDIT_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Site identifier stamped on every audit record.
    pub unit_code: String,
    /// Bounds parse, lookup and audit wait together.
    pub deadline: Duration,
    pub audit_timeout: Duration,
    pub max_audit_attempts: u32,
    /// Emit audit notes for input rejected before the store.
    pub audit_rejections: bool,
    pub codec: CodecLimits,
    pub matching: MatchPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            unit_code: "DEFAULT".to_string(),
            deadline: DEFAULT_DEADLINE,
            audit_timeout: DEFAULT_AUDIT_TIMEOUT,
            max_audit_attempts: DEFAULT_MAX_AUDIT_ATTEMPTS,
            audit_rejections: true,
            codec: CodecLimits::default(),
            matching: MatchPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.unit_code.trim().is_empty() {
            return Err(OrchestratorError::InvalidConfig(
                "unit_code cannot be empty".into(),
            ));
        }
        if self.deadline.is_zero() {
            return Err(OrchestratorError::InvalidConfig(
                "deadline cannot be 0".into(),
            ));
        }
        if self.audit_timeout.is_zero() {
            return Err(OrchestratorError::InvalidConfig(
                "audit_timeout cannot be 0".into(),
            ));
        }
        if self.max_audit_attempts == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "max_audit_attempts cannot be 0".into(),
            ));
        }
        self.codec.validate()?;
        self.matching.validate()?;
        Ok(())
    }
}
