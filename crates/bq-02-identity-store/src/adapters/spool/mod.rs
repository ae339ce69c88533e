//! Audit spool adapters.

pub mod file;
pub mod lock;
pub mod memory;

pub use file::{FileAuditSpool, DEFAULT_MAX_SPOOLED};
pub use lock::{ReplayClaim, SpoolLock};
pub use memory::InMemoryAuditSpool;
