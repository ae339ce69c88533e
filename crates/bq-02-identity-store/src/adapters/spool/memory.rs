//! In-memory audit spool, for tests and the `simulate` command.

use parking_lot::Mutex;

use crate::domain::{SpoolError, SpooledAudit};
use crate::ports::outbound::{AuditSpool, SpoolBatch};

#[derive(Default)]
struct SpoolState {
    pending: Vec<SpooledAudit>,
    claimed: usize,
    dead: Vec<SpooledAudit>,
}

/// Volatile [`AuditSpool`]. Nothing survives the process.
pub struct InMemoryAuditSpool {
    state: Mutex<SpoolState>,
    capacity: usize,
}

impl InMemoryAuditSpool {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(SpoolState::default()),
            capacity,
        }
    }

    /// Snapshot of pending records.
    pub fn pending(&self) -> Vec<SpooledAudit> {
        self.state.lock().pending.clone()
    }

    /// Snapshot of dead-lettered records.
    pub fn dead_letters(&self) -> Vec<SpooledAudit> {
        self.state.lock().dead.clone()
    }
}

impl AuditSpool for InMemoryAuditSpool {
    fn enqueue(&self, entry: SpooledAudit) -> Result<(), SpoolError> {
        let mut state = self.state.lock();
        if state.pending.len() + state.claimed >= self.capacity {
            return Err(SpoolError::Full {
                capacity: self.capacity,
            });
        }
        state.pending.push(entry);
        Ok(())
    }

    fn take_batch(&self) -> Result<SpoolBatch, SpoolError> {
        let mut state = self.state.lock();
        let entries = std::mem::take(&mut state.pending);
        let claimed = entries.len();
        state.claimed += claimed;
        Ok(SpoolBatch {
            entries,
            claimed,
            claims: Vec::new(),
        })
    }

    fn complete(&self, batch: SpoolBatch, retry: Vec<SpooledAudit>) -> Result<(), SpoolError> {
        let mut state = self.state.lock();
        state.claimed = state.claimed.saturating_sub(batch.claimed);
        state.pending.extend(retry);
        Ok(())
    }

    fn dead_letter(&self, entry: SpooledAudit) -> Result<(), SpoolError> {
        self.state.lock().dead.push(entry);
        Ok(())
    }

    fn depth(&self) -> Result<usize, SpoolError> {
        let state = self.state.lock();
        Ok(state.pending.len() + state.claimed)
    }

    fn dead_letter_depth(&self) -> Result<usize, SpoolError> {
        Ok(self.state.lock().dead.len())
    }
}
