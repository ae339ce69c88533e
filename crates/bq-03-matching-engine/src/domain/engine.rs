//! Decision policy over scored candidates.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use shared_types::{Decision, DecisionReason, FingerPosition, MatchCandidate, TemplateId};

use super::errors::MatchPolicyError;
use super::policy::MatchPolicy;

/// The decision plus the bookkeeping behind it, for structured logging.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchEvaluation {
    pub decision: Decision,
    /// Candidates returned by the store.
    pub considered: usize,
    /// Candidates left after the finger filter.
    pub same_finger: usize,
    /// Winning template and its score, if any candidate survived the filter.
    pub best: Option<(TemplateId, f64)>,
}

/// Applies a [`MatchPolicy`] to candidate lists.
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    policy: MatchPolicy,
}

impl MatchingEngine {
    pub fn new(policy: MatchPolicy) -> Result<Self, MatchPolicyError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    pub fn decide(
        &self,
        candidates: &[MatchCandidate],
        claimed_finger: FingerPosition,
        decided_at: DateTime<Utc>,
    ) -> Decision {
        self.evaluate(candidates, claimed_finger, decided_at).decision
    }

    pub fn evaluate(
        &self,
        candidates: &[MatchCandidate],
        claimed_finger: FingerPosition,
        decided_at: DateTime<Utc>,
    ) -> MatchEvaluation {
        let mut same_finger = 0usize;
        let mut best: Option<&MatchCandidate> = None;

        for candidate in candidates
            .iter()
            .filter(|c| c.enrolled_finger() == claimed_finger)
        {
            same_finger += 1;
            best = match best {
                Some(current) if !outranks(candidate, current) => Some(current),
                _ => Some(candidate),
            };
        }

        let decision = match best {
            Some(winner) if winner.score() >= self.policy.threshold => {
                Decision::grant(winner.identity_id(), winner.score(), decided_at)
            }
            Some(winner) => {
                Decision::deny(DecisionReason::NoMatch, Some(winner.score()), decided_at)
            }
            None => Decision::deny(DecisionReason::NoMatch, None, decided_at),
        };

        MatchEvaluation {
            decision,
            considered: candidates.len(),
            same_finger,
            best: best.map(|c| (c.template_id(), c.score())),
        }
    }
}

/// Total order on candidates: higher score first, then lower template id.
fn outranks(challenger: &MatchCandidate, incumbent: &MatchCandidate) -> bool {
    match challenger.score().total_cmp(&incumbent.score()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => challenger.template_id() < incumbent.template_id(),
    }
}
