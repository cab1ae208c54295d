use crate::error::{Result, StackmatchError};
use crate::project_identity;
use crate::state::types::Journal;
use std::fs;
use std::io::Write;
use std::path::Path;

use super::CURRENT_JOURNAL_SCHEMA_VERSION;
use super::backup_ops::{journal_file_name, rotate_backups};

pub(super) fn prepare_and_write_journal(journal: &Journal, path: &Path) -> Result<()> {
    let journal = normalize_journal_for_persist(journal);
    write_journal_atomically(path, &journal)
}

fn normalize_journal_for_persist(journal: &Journal) -> Journal {
    let mut journal = journal.clone();
    journal.meta.schema_version = CURRENT_JOURNAL_SCHEMA_VERSION;
    journal.meta.revision += 1;
    if journal.meta.generator.is_none() {
        journal.meta.generator = Some(project_identity::STABLE_PROJECT_ID.to_string());
    }
    journal
}

fn write_journal_atomically(path: &Path, journal: &Journal) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        StackmatchError::PathError(format!(
            "Invalid journal path (no parent directory): {}",
            path.display()
        ))
    })?;

    let content = serde_json::to_string_pretty(journal)?;
    let _: Journal = serde_json::from_str(&content)?;

    rotate_backups(path)?;

    let tmp_path = dir.join(format!("{}.tmp", journal_file_name(path)?));
    let mut tmp_file = fs::File::create(&tmp_path).map_err(|e| StackmatchError::IoError {
        path: tmp_path.clone(),
        source: e,
    })?;

    tmp_file.write_all(content.as_bytes())?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path).map_err(|e| StackmatchError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
