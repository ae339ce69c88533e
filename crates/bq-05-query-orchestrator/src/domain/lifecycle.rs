//! Per-request state machine.

use std::fmt;

use shared_types::DecisionReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Received,
    Parsed,
    Validated,
    Matched,
    Audited,
    Responded,
    Failed(DecisionReason),
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryState::Responded | QueryState::Failed(_))
    }

    pub fn can_transition_to(&self, next: QueryState) -> bool {
        use QueryState::*;
        match (self, next) {
            (Received, Parsed)
            | (Parsed, Validated)
            | (Validated, Matched)
            | (Matched, Audited)
            | (Matched, Responded)
            | (Audited, Responded) => true,
            (current, Failed(_)) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryState::Received => f.write_str("RECEIVED"),
            QueryState::Parsed => f.write_str("PARSED"),
            QueryState::Validated => f.write_str("VALIDATED"),
            QueryState::Matched => f.write_str("MATCHED"),
            QueryState::Audited => f.write_str("AUDITED"),
            QueryState::Responded => f.write_str("RESPONDED"),
            QueryState::Failed(reason) => write!(f, "FAILED({reason})"),
        }
    }
}

/// Illegal state change. Indicates a bug in the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid query transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: QueryState,
    pub to: QueryState,
}

/// The states one request went through, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLifecycle {
    history: Vec<QueryState>,
}

impl Default for QueryLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryLifecycle {
    pub fn new() -> Self {
        Self {
            history: vec![QueryState::Received],
        }
    }

    pub fn current(&self) -> QueryState {
        // history always starts with Received
        self.history
            .last()
            .copied()
            .unwrap_or(QueryState::Received)
    }

    pub fn advance(&mut self, next: QueryState) -> Result<(), InvalidTransition> {
        let from = self.current();
        if !from.can_transition_to(next) {
            return Err(InvalidTransition { from, to: next });
        }
        self.history.push(next);
        Ok(())
    }

    pub fn history(&self) -> &[QueryState] {
        &self.history
    }
}
