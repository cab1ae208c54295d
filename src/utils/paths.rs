use crate::error::{Result, StackmatchError};
use crate::project_identity;
use directories::{ProjectDirs, UserDirs};
use std::path::{Path, PathBuf};

pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();

    if !path_str.starts_with('~') {
        return Ok(path.to_path_buf());
    }

    let user_dirs = UserDirs::new().ok_or_else(|| {
        StackmatchError::PathError("Could not determine user home directory".to_string())
    })?;
    let home = user_dirs.home_dir();

    if path_str == "~" {
        return Ok(home.to_path_buf());
    }

    let stripped = path_str
        .strip_prefix("~/")
        .ok_or_else(|| StackmatchError::PathError(format!("Invalid path format: {}", path_str)))?;

    Ok(home.join(stripped))
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(
        "dev",
        project_identity::STABLE_PROJECT_ID,
        project_identity::STABLE_PROJECT_ID,
    )
    .ok_or_else(|| StackmatchError::PathError("Could not determine project directories".to_string()))
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(project_identity::CONFIG_FILE_BASENAME))
}

/// `$XDG_STATE_HOME/stackmatch` on Linux, the local data dir elsewhere.
pub fn state_dir() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs
        .state_dir()
        .unwrap_or_else(|| dirs.data_local_dir())
        .to_path_buf())
}

pub fn journal_file() -> Result<PathBuf> {
    Ok(state_dir()?.join(project_identity::JOURNAL_FILE_BASENAME))
}

pub fn home_dir() -> Option<PathBuf> {
    UserDirs::new().map(|d| d.home_dir().to_path_buf())
}
