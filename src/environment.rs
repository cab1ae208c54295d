//! Environment snapshots: scanning, and reading/writing them as JSON.

pub mod scanner;
pub mod types;

pub use scanner::Scanner;
pub use types::{EnvironmentData, SystemInfo};

use crate::error::{Result, StackmatchError};
use std::fs;
use std::path::Path;

/// Write a snapshot as pretty JSON, replacing any existing file.
pub fn export_json(data: &EnvironmentData, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(data)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty())
        && !dir.exists()
    {
        fs::create_dir_all(dir).map_err(|e| StackmatchError::IoError {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, content).map_err(|e| StackmatchError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn import_json(path: &Path) -> Result<EnvironmentData> {
    let content = fs::read_to_string(path).map_err(|e| StackmatchError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| {
        StackmatchError::ConfigError(format!(
            "{} is not an environment snapshot: {}",
            path.display(),
            e
        ))
    })
}
