use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::lock::{ReplayClaim, SpoolLock};
use crate::domain::{SpoolError, SpooledAudit};
use crate::ports::outbound::{AuditSpool, SpoolBatch};

/// Default spool capacity.
pub const DEFAULT_MAX_SPOOLED: usize = 10_000;

const SPOOL_FILE: &str = "audit-spool.jsonl";
const DEAD_LETTER_FILE: &str = "audit-dead-letter.jsonl";
const CORRUPT_FILE: &str = "audit-spool.corrupt";
const REPLAY_PREFIX: &str = "audit-replay-";
const REPLAY_SUFFIX: &str = ".jsonl";

/// JSON-lines audit spool in a local directory.
///
/// Layout:
///
/// ```text
/// <spool_dir>/
/// ├── spool.lock                  # flock, held per operation
/// ├── audit-spool.jsonl           # pending records, one JSON object per line
/// ├── audit-replay-<uuid>.jsonl   # claimed by a replay pass in progress
/// ├── audit-dead-letter.jsonl     # exhausted records, never deleted here
/// └── audit-spool.corrupt         # lines that failed to parse, verbatim
/// ```
///
/// `take_batch` renames the pending file to a replay file, so enqueues
/// during a replay land in a fresh pending file. Each replay file stays
/// claimed until `complete`, and concurrent passes skip claimed files.
/// Replay files left behind by a crash are unclaimed and picked up again by
/// the next `take_batch`; the store drops the resulting duplicates by
/// `audit_id`.
pub struct FileAuditSpool {
    dir: PathBuf,
    capacity: usize,
}

impl FileAuditSpool {
    /// Opens (creating if needed) the spool in `dir`.
    pub fn open<P: AsRef<Path>>(dir: P, capacity: usize) -> Result<Self, SpoolError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let spool = Self { dir, capacity };
        debug!(dir = %spool.dir.display(), capacity, "audit spool opened");
        Ok(spool)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn spool_path(&self) -> PathBuf {
        self.dir.join(SPOOL_FILE)
    }

    fn dead_letter_path(&self) -> PathBuf {
        self.dir.join(DEAD_LETTER_FILE)
    }

    fn replay_files(&self) -> Result<Vec<PathBuf>, SpoolError> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| {
                        name.starts_with(REPLAY_PREFIX) && name.ends_with(REPLAY_SUFFIX)
                    })
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn pending_count(&self) -> Result<usize, SpoolError> {
        let mut count = count_lines(&self.spool_path())?;
        for replay in self.replay_files()? {
            count += count_lines(&replay)?;
        }
        Ok(count)
    }

    fn read_entries(&self, path: &Path) -> Result<Vec<SpooledAudit>, SpoolError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SpooledAudit>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    // Typically a torn final line after a crash mid-append.
                    warn!(
                        file = %path.display(),
                        line = index + 1,
                        error = %e,
                        "unparseable spool line moved to corrupt file"
                    );
                    append_raw(&self.dir.join(CORRUPT_FILE), line)?;
                }
            }
        }
        Ok(entries)
    }
}

impl AuditSpool for FileAuditSpool {
    fn enqueue(&self, entry: SpooledAudit) -> Result<(), SpoolError> {
        let _lock = SpoolLock::acquire(&self.dir)?;
        if self.pending_count()? >= self.capacity {
            return Err(SpoolError::Full {
                capacity: self.capacity,
            });
        }
        append_lines(&self.spool_path(), std::slice::from_ref(&entry))
    }

    fn take_batch(&self) -> Result<SpoolBatch, SpoolError> {
        let _lock = SpoolLock::acquire(&self.dir)?;

        let pending = self.spool_path();
        if count_lines(&pending)? > 0 {
            let claim = self
                .dir
                .join(format!("{REPLAY_PREFIX}{}{REPLAY_SUFFIX}", Uuid::new_v4()));
            fs::rename(&pending, &claim)?;
        }

        let mut claims = Vec::new();
        let mut entries = Vec::new();
        for path in self.replay_files()? {
            // Held by a replay pass in another process or spool handle.
            let Some(claim) = ReplayClaim::try_claim(&path)? else {
                debug!(file = %path.display(), "replay file busy, skipped");
                continue;
            };
            entries.extend(self.read_entries(claim.path())?);
            claims.push(claim);
        }
        Ok(SpoolBatch {
            claimed: entries.len(),
            entries,
            claims,
        })
    }

    fn complete(&self, batch: SpoolBatch, retry: Vec<SpooledAudit>) -> Result<(), SpoolError> {
        let _lock = SpoolLock::acquire(&self.dir)?;
        if !retry.is_empty() {
            append_lines(&self.spool_path(), &retry)?;
        }
        // Removed while still claimed; the claims drop with the batch.
        for claim in &batch.claims {
            match fs::remove_file(claim.path()) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn dead_letter(&self, entry: SpooledAudit) -> Result<(), SpoolError> {
        let _lock = SpoolLock::acquire(&self.dir)?;
        append_lines(&self.dead_letter_path(), std::slice::from_ref(&entry))
    }

    fn depth(&self) -> Result<usize, SpoolError> {
        let _lock = SpoolLock::acquire(&self.dir)?;
        self.pending_count()
    }

    fn dead_letter_depth(&self) -> Result<usize, SpoolError> {
        let _lock = SpoolLock::acquire(&self.dir)?;
        count_lines(&self.dead_letter_path())
    }
}

/// Appends entries as JSON lines and syncs before returning.
fn append_lines(path: &Path, entries: &[SpooledAudit]) -> Result<(), SpoolError> {
    let mut buffer = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut buffer, entry).map_err(|e| SpoolError::Encode(e.to_string()))?;
        buffer.push(b'\n');
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&buffer)?;
    file.sync_data()?;
    Ok(())
}

fn append_raw(path: &Path, line: &str) -> Result<(), SpoolError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    file.sync_data()?;
    Ok(())
}

fn count_lines(path: &Path) -> Result<usize, SpoolError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents.lines().filter(|l| !l.trim().is_empty()).count()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}
