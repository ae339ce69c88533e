//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Request**: `Template`, `FingerPosition`, `TransportOrigin`, `QueryRequest`
//! - **Matching**: `IdentityId`, `TemplateId`, `MatchCandidate`
//! - **Outcome**: `DecisionReason`, `Decision`
//! - **Audit**: `AuditId`, `TemplateFingerprint`, `AuditRecord`

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CandidateError, DecisionError, EmptyTemplateError, UnknownFingerError};

// =============================================================================
// CLUSTER A: THE REQUEST
// =============================================================================

/// One of the ten enrolled finger positions.
///
/// The set is closed. Wire tokens are `<finger>_<hand>` in lower case and are
/// matched exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerPosition {
    ThumbRight,
    IndexRight,
    MiddleRight,
    RingRight,
    PinkyRight,
    ThumbLeft,
    IndexLeft,
    MiddleLeft,
    RingLeft,
    PinkyLeft,
}

impl FingerPosition {
    /// Every position, right hand first.
    pub const ALL: [FingerPosition; 10] = [
        FingerPosition::ThumbRight,
        FingerPosition::IndexRight,
        FingerPosition::MiddleRight,
        FingerPosition::RingRight,
        FingerPosition::PinkyRight,
        FingerPosition::ThumbLeft,
        FingerPosition::IndexLeft,
        FingerPosition::MiddleLeft,
        FingerPosition::RingLeft,
        FingerPosition::PinkyLeft,
    ];

    /// Canonical wire token.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FingerPosition::ThumbRight => "thumb_right",
            FingerPosition::IndexRight => "index_right",
            FingerPosition::MiddleRight => "middle_right",
            FingerPosition::RingRight => "ring_right",
            FingerPosition::PinkyRight => "pinky_right",
            FingerPosition::ThumbLeft => "thumb_left",
            FingerPosition::IndexLeft => "index_left",
            FingerPosition::MiddleLeft => "middle_left",
            FingerPosition::RingLeft => "ring_left",
            FingerPosition::PinkyLeft => "pinky_left",
        }
    }
}

impl fmt::Display for FingerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FingerPosition {
    type Err = UnknownFingerError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        FingerPosition::ALL
            .into_iter()
            .find(|finger| finger.as_str() == token)
            .ok_or_else(|| UnknownFingerError {
                token: token.to_string(),
            })
    }
}

/// The transport a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportOrigin {
    Cli,
    Serial,
    Tcp,
}

impl TransportOrigin {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportOrigin::Cli => "cli",
            TransportOrigin::Serial => "serial",
            TransportOrigin::Tcp => "tcp",
        }
    }
}

impl fmt::Display for TransportOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque biometric template bytes as produced by the sensor.
///
/// Never empty. `Debug` prints only the length so templates cannot leak into
/// logs through `{:?}`.
#[derive(Clone, PartialEq, Eq)]
pub struct Template(Vec<u8>);

impl Template {
    pub fn new(bytes: Vec<u8>) -> Result<Self, EmptyTemplateError> {
        if bytes.is_empty() {
            return Err(EmptyTemplateError);
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Template({} bytes)", self.0.len())
    }
}

/// A fully validated access query.
///
/// Created when a frame passes parsing and validation; dropped once the
/// response has been written.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub template: Template,
    pub claimed_finger: FingerPosition,
    pub transport_origin: TransportOrigin,
    pub received_at: DateTime<Utc>,
}

// =============================================================================
// CLUSTER B: MATCHING
// =============================================================================

/// Identity (person) key in the identity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub i64);

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enrolled template key in the identity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub i64);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A scored enrolled template returned by the identity store.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    identity_id: IdentityId,
    template_id: TemplateId,
    score: f64,
    enrolled_finger: FingerPosition,
}

impl MatchCandidate {
    pub fn new(
        identity_id: IdentityId,
        template_id: TemplateId,
        score: f64,
        enrolled_finger: FingerPosition,
    ) -> Result<Self, CandidateError> {
        if !score.is_finite() {
            return Err(CandidateError::NonFiniteScore);
        }
        if !(0.0..=1.0).contains(&score) {
            return Err(CandidateError::ScoreOutOfRange { score });
        }
        Ok(Self {
            identity_id,
            template_id,
            score,
            enrolled_finger,
        })
    }

    pub fn identity_id(&self) -> IdentityId {
        self.identity_id
    }

    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn enrolled_finger(&self) -> FingerPosition {
        self.enrolled_finger
    }
}

// =============================================================================
// CLUSTER C: THE OUTCOME
// =============================================================================

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    Match,
    NoMatch,
    InvalidTemplate,
    InvalidFinger,
    /// The frame never became a request: wrong field count, unknown keyword
    /// or non UTF-8 bytes.
    MalformedFrame,
    StoreError,
    Timeout,
}

impl DecisionReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::Match => "MATCH",
            DecisionReason::NoMatch => "NO_MATCH",
            DecisionReason::InvalidTemplate => "INVALID_TEMPLATE",
            DecisionReason::InvalidFinger => "INVALID_FINGER",
            DecisionReason::MalformedFrame => "MALFORMED_FRAME",
            DecisionReason::StoreError => "STORE_ERROR",
            DecisionReason::Timeout => "TIMEOUT",
        }
    }

    /// Parses the upper-case wire form produced by [`DecisionReason::as_str`].
    pub fn from_wire(token: &str) -> Option<Self> {
        [
            DecisionReason::Match,
            DecisionReason::NoMatch,
            DecisionReason::InvalidTemplate,
            DecisionReason::InvalidFinger,
            DecisionReason::MalformedFrame,
            DecisionReason::StoreError,
            DecisionReason::Timeout,
        ]
        .into_iter()
        .find(|reason| reason.as_str() == token)
    }

    /// Input rejected before it could reach the identity store.
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            DecisionReason::InvalidTemplate
                | DecisionReason::InvalidFinger
                | DecisionReason::MalformedFrame
        )
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The grant/deny outcome of one request.
///
/// `granted` is true exactly when `reason` is [`DecisionReason::Match`].
/// Deserialization enforces the same rule, so a spooled line cannot forge a
/// grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DecisionFields")]
pub struct Decision {
    granted: bool,
    identity_id: Option<IdentityId>,
    reason: DecisionReason,
    score_used: Option<f64>,
    decided_at: DateTime<Utc>,
}

impl Decision {
    /// A positive match on `identity_id` at `score`.
    pub fn grant(identity_id: IdentityId, score: f64, decided_at: DateTime<Utc>) -> Self {
        Self {
            granted: true,
            identity_id: Some(identity_id),
            reason: DecisionReason::Match,
            score_used: Some(score),
            decided_at,
        }
    }

    /// A denial. `score_used` carries the best same-finger score when one
    /// was evaluated.
    pub fn deny(
        reason: DecisionReason,
        score_used: Option<f64>,
        decided_at: DateTime<Utc>,
    ) -> Self {
        debug_assert_ne!(reason, DecisionReason::Match, "a MATCH is always granted");
        Self {
            granted: false,
            identity_id: None,
            reason,
            score_used,
            decided_at,
        }
    }

    pub fn granted(&self) -> bool {
        self.granted
    }

    pub fn identity_id(&self) -> Option<IdentityId> {
        self.identity_id
    }

    pub fn reason(&self) -> DecisionReason {
        self.reason
    }

    pub fn score_used(&self) -> Option<f64> {
        self.score_used
    }

    pub fn decided_at(&self) -> DateTime<Utc> {
        self.decided_at
    }
}

/// Wire shape of [`Decision`], checked before it becomes one.
#[derive(Deserialize)]
struct DecisionFields {
    granted: bool,
    identity_id: Option<IdentityId>,
    reason: DecisionReason,
    score_used: Option<f64>,
    decided_at: DateTime<Utc>,
}

impl TryFrom<DecisionFields> for Decision {
    type Error = DecisionError;

    fn try_from(fields: DecisionFields) -> Result<Self, Self::Error> {
        if fields.granted != (fields.reason == DecisionReason::Match) {
            return Err(DecisionError::GrantMismatch {
                granted: fields.granted,
                reason: fields.reason,
            });
        }
        if fields.granted != fields.identity_id.is_some() {
            return Err(DecisionError::IdentityMismatch {
                granted: fields.granted,
                identity: fields.identity_id.is_some(),
            });
        }
        Ok(Self {
            granted: fields.granted,
            identity_id: fields.identity_id,
            reason: fields.reason,
            score_used: fields.score_used,
            decided_at: fields.decided_at,
        })
    }
}

// =============================================================================
// CLUSTER D: THE AUDIT TRAIL
// =============================================================================

/// Idempotency key of an audit record.
///
/// Assigned once when the record is built; every retry reuses it so the store
/// can drop duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(pub Uuid);

impl AuditId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Short non-reversible digest of a template (hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateFingerprint(String);

impl TemplateFingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Append-only record of one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: AuditId,
    /// Site/unit the decision was taken for.
    pub unit_code: String,
    pub transport: TransportOrigin,
    /// Absent when the finger token itself was rejected.
    pub claimed_finger: Option<FingerPosition>,
    pub template_fingerprint: TemplateFingerprint,
    pub decision: Decision,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Builds the record for `decision`, stamped with a fresh [`AuditId`].
    pub fn for_decision(
        unit_code: impl Into<String>,
        transport: TransportOrigin,
        claimed_finger: Option<FingerPosition>,
        template_fingerprint: TemplateFingerprint,
        decision: Decision,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            audit_id: AuditId::new(),
            unit_code: unit_code.into(),
            transport,
            claimed_finger,
            template_fingerprint,
            decision,
            timestamp,
        }
    }

    pub fn granted(&self) -> bool {
        self.decision.granted()
    }

    /// Identity the record refers to; only set for granted decisions.
    pub fn identity_id(&self) -> Option<IdentityId> {
        self.decision.identity_id()
    }
}
