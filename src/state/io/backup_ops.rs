use crate::error::{Result, StackmatchError};
use crate::state::types::Journal;
use crate::ui;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_BACKUPS: usize = 3;

pub(super) fn journal_file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            StackmatchError::PathError(format!("Invalid journal path: {}", path.display()))
        })
}

/// `<journal>.bak.<n>` next to the journal.
pub(super) fn backup_path(path: &Path, n: usize) -> Result<PathBuf> {
    Ok(path.with_file_name(format!("{}.bak.{}", journal_file_name(path)?, n)))
}

/// Newest parseable backup, copied back over the journal.
pub(super) fn restore_from_backup(path: &Path) -> Result<Option<Journal>> {
    for i in 1..=MAX_BACKUPS {
        let backup = backup_path(path, i)?;
        if !backup.exists() {
            continue;
        }
        let content = fs::read_to_string(&backup).map_err(|e| StackmatchError::IoError {
            path: backup.clone(),
            source: e,
        })?;

        match serde_json::from_str::<Journal>(&content) {
            Ok(journal) => {
                if let Err(e) = fs::copy(&backup, path) {
                    ui::warning(&format!(
                        "Restored journal from {} but could not write it back: {}",
                        backup.display(),
                        e
                    ));
                }
                return Ok(Some(journal));
            }
            Err(_) => continue,
        }
    }

    Ok(None)
}

pub(super) fn rotate_backups(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    for i in (1..MAX_BACKUPS).rev() {
        let old_bak = backup_path(path, i)?;
        let new_bak = backup_path(path, i + 1)?;
        if old_bak.exists()
            && let Err(e) = fs::rename(&old_bak, &new_bak)
        {
            ui::warning(&format!(
                "Failed to rotate backup {} -> {}: {}",
                old_bak.display(),
                new_bak.display(),
                e
            ));
        }
    }

    let first_bak = backup_path(path, 1)?;
    fs::copy(path, &first_bak).map_err(|e| StackmatchError::IoError {
        path: first_bak,
        source: e,
    })?;

    Ok(())
}
