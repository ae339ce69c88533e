//! Gateway entities.

use std::path::Path;

use bq_01_template_codec::{CodecLimits, TemplateCodec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{AuditRecord, FingerPosition, IdentityId, TemplateId};

use super::errors::StoreError;

/// Largest template accepted from an enrollment fixture.
const FIXTURE_MAX_TEMPLATE_BYTES: usize = 1 << 20;

/// An enrolled template as held by the identity store.
#[derive(Clone, PartialEq, Eq)]
pub struct EnrolledTemplate {
    pub identity_id: IdentityId,
    pub template_id: TemplateId,
    pub finger: FingerPosition,
    pub template: Vec<u8>,
}

impl std::fmt::Debug for EnrolledTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrolledTemplate")
            .field("identity_id", &self.identity_id)
            .field("template_id", &self.template_id)
            .field("finger", &self.finger)
            .field("template_len", &self.template.len())
            .finish()
    }
}

/// On-disk enrollment fixture for the in-memory backend.
///
/// ```json
/// { "templates": [
///     { "identity_id": 1, "template_id": 1, "finger": "index_right", "template": "<base64>" }
/// ] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentFixture {
    pub templates: Vec<FixtureEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureEntry {
    pub identity_id: i64,
    pub template_id: i64,
    pub finger: FingerPosition,
    /// Standard base64.
    pub template: String,
}

impl EnrollmentFixture {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Fixture(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Fixture(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn into_templates(self) -> Result<Vec<EnrolledTemplate>, StoreError> {
        let codec = TemplateCodec::new(CodecLimits {
            min_template_bytes: 1,
            max_template_bytes: FIXTURE_MAX_TEMPLATE_BYTES,
        });
        self.templates
            .into_iter()
            .map(|entry| {
                let template = codec.decode(&entry.template).map_err(|e| {
                    StoreError::Fixture(format!("template {}: {e}", entry.template_id))
                })?;
                Ok(EnrolledTemplate {
                    identity_id: IdentityId(entry.identity_id),
                    template_id: TemplateId(entry.template_id),
                    finger: entry.finger,
                    template: template.as_bytes().to_vec(),
                })
            })
            .collect()
    }
}

/// An audit record waiting in the spool for a successful store append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpooledAudit {
    pub record: AuditRecord,
    /// Failed append attempts so far, including the original one.
    pub attempts: u32,
    pub spooled_at: DateTime<Utc>,
    pub last_error: String,
}

impl SpooledAudit {
    pub fn new(record: AuditRecord, error: impl ToString) -> Self {
        Self {
            record,
            attempts: 1,
            spooled_at: Utc::now(),
            last_error: error.to_string(),
        }
    }

    /// Records one more failed attempt.
    pub fn failed_again(mut self, error: impl ToString) -> Self {
        self.attempts = self.attempts.saturating_add(1);
        self.last_error = error.to_string();
        self
    }
}
