use crate::error::{Result, StackmatchError};
use crate::state::types::Journal;
use crate::ui;
use std::fs;
use std::path::Path;

use super::backup_ops::restore_from_backup;

/// Load the journal at `path`. A missing file is an empty journal; an
/// unreadable or corrupted one is replaced by the newest valid backup, and
/// is an error when there is none.
pub fn load_journal(path: &Path) -> Result<Journal> {
    if !path.exists() {
        return Ok(Journal::default());
    }

    let problem = match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => return Ok(Journal::default()),
        Ok(content) => match serde_json::from_str::<Journal>(&content) {
            Ok(journal) => return Ok(journal),
            Err(e) => format!("Journal file corrupted: {}", e),
        },
        Err(e) => format!("Failed to read journal file: {}", e),
    };

    ui::error(&problem);
    ui::info("Attempting to restore from backup...");
    match restore_from_backup(path)? {
        Some(journal) => {
            ui::success("Journal restored from backup successfully");
            Ok(journal)
        }
        None => Err(StackmatchError::ConfigError(format!(
            "{}\nFile: {}\nNo valid backup found; move the file aside to start a new journal.",
            problem,
            path.display()
        ))),
    }
}
