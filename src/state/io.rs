mod backup_ops;
mod load_recovery;
mod locking;
mod persist;

use crate::error::{Result, StackmatchError};
use crate::state::types::Journal;
use std::fs;
use std::path::Path;

pub use load_recovery::load_journal;
pub use locking::{JournalLock, acquire_lock};

pub(crate) const CURRENT_JOURNAL_SCHEMA_VERSION: u8 = 1;

/// Make sure the journal's directory exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        StackmatchError::PathError(format!(
            "Invalid journal path (no parent directory): {}",
            path.display()
        ))
    })?;
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| StackmatchError::IoError {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Persist the journal: exclusive lock, backup rotation, then an atomic
/// replace of the file.
pub fn save_journal(journal: &Journal, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let _lock = acquire_lock(path)?;
    persist::prepare_and_write_journal(journal, path)
}
