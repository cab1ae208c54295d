//! Settings Module
//!
//! Loads `stackmatch.kdl` and layers environment and command-line
//! overrides on top of it.

use crate::core::types::PackageManagerType;
use crate::error::{Result, StackmatchError};
use crate::packages::mappings::{PackageMapping, PackageMappings};
use crate::packages::runner::{DEFAULT_COMMAND_TIMEOUT, SystemRunner};
use crate::project_identity;
use crate::utils::paths;
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Values given on the command line. They win over the file and the
/// environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub journal: Option<PathBuf>,
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Journal file; `None` means the per-user state directory
    pub journal: Option<PathBuf>,
    pub timeout: Duration,
    pub prefer: Option<PackageManagerType>,
    pub sudo: bool,
    /// Extra name mappings, registered after the built-in table
    pub mappings: Vec<PackageMapping>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            journal: None,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            prefer: None,
            sudo: false,
            mappings: Vec::new(),
        }
    }
}

impl Settings {
    /// Settings for this process: config file, then `STACKMATCH_*`
    /// variables, then `overrides`.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// `load` with an injectable environment lookup.
    pub fn resolve(overrides: &Overrides, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config_path = match &overrides.config {
            Some(path) => paths::expand_home(path)?,
            None => match env(&project_identity::env_key("CONFIG")) {
                Some(value) if !value.trim().is_empty() => {
                    paths::expand_home(Path::new(value.trim()))?
                }
                _ => paths::config_file()?,
            },
        };

        let mut settings = Self::load_from(&config_path)?;

        if let Some(value) = env(&project_identity::env_key("JOURNAL"))
            && !value.trim().is_empty()
        {
            settings.journal = Some(PathBuf::from(value.trim()));
        }
        if let Some(journal) = &overrides.journal {
            settings.journal = Some(journal.clone());
        }
        if let Some(seconds) = overrides.timeout {
            settings.timeout = checked_timeout(seconds as i128)?;
        }

        Ok(settings)
    }

    /// Parse the file at `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| StackmatchError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content).map_err(|e| match e {
            StackmatchError::ConfigError(msg) => {
                StackmatchError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let doc: KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
            StackmatchError::ConfigError(format!("KDL parsing error: {}", e))
        })?;

        let mut settings = Self::default();
        for node in doc.nodes() {
            match node.name().value() {
                "journal" => {
                    settings.journal = Some(PathBuf::from(string_arg(node)?));
                }
                "timeout" => {
                    let seconds = first_arg(node)
                        .and_then(KdlValue::as_integer)
                        .ok_or_else(|| {
                            StackmatchError::ConfigError(
                                "'timeout' expects a number of seconds".to_string(),
                            )
                        })?;
                    settings.timeout = checked_timeout(seconds)?;
                }
                "prefer" => {
                    settings.prefer = Some(string_arg(node)?.parse()?);
                }
                "sudo" => {
                    settings.sudo = first_arg(node).and_then(KdlValue::as_bool).ok_or_else(|| {
                        StackmatchError::ConfigError("'sudo' expects #true or #false".to_string())
                    })?;
                }
                "mapping" => settings.mappings.push(parse_mapping(node)?),
                other => {
                    return Err(StackmatchError::ConfigError(format!(
                        "Unknown setting '{}'. Valid settings: journal, timeout, prefer, sudo, mapping",
                        other
                    )));
                }
            }
        }

        Ok(settings)
    }

    /// Configured journal path with `~` expanded, or the default location.
    pub fn journal_path(&self) -> Result<PathBuf> {
        match &self.journal {
            Some(path) => paths::expand_home(path),
            None => paths::journal_file(),
        }
    }

    /// Built-in mappings plus the configured ones.
    pub fn package_mappings(&self) -> Result<PackageMappings> {
        let mut table = PackageMappings::builtin();
        for mapping in &self.mappings {
            table.add_mapping(mapping.clone())?;
        }
        Ok(table)
    }

    pub fn runner(&self) -> SystemRunner {
        SystemRunner::new(self.timeout, self.sudo)
    }
}

fn checked_timeout(seconds: i128) -> Result<Duration> {
    if seconds <= 0 || seconds > u64::MAX as i128 {
        return Err(StackmatchError::ConfigError(format!(
            "Invalid timeout '{}': expected a positive number of seconds",
            seconds
        )));
    }
    Ok(Duration::from_secs(seconds as u64))
}

/// First positional argument.
fn first_arg(node: &KdlNode) -> Option<&KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

fn string_arg(node: &KdlNode) -> Result<String> {
    first_arg(node)
        .and_then(KdlValue::as_string)
        .map(str::to_string)
        .ok_or_else(|| {
            StackmatchError::ConfigError(format!(
                "'{}' expects a string argument",
                node.name().value()
            ))
        })
}

/// `mapping "nodejs" description="..." { brew "node"; winget "OpenJS.NodeJS" }`
fn parse_mapping(node: &KdlNode) -> Result<PackageMapping> {
    let name = string_arg(node)?;
    let description = node
        .entries()
        .iter()
        .find(|e| e.name().is_some_and(|n| n.value() == "description"))
        .and_then(|e| e.value().as_string())
        .unwrap_or_default();

    let mut mapping = PackageMapping::new(&name, description);
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let manager: PackageManagerType = child.name().value().parse()?;
            mapping = mapping.with(manager, &string_arg(child)?);
        }
    }
    if mapping.packages.is_empty() {
        return Err(StackmatchError::NoManagerEntries { name });
    }
    Ok(mapping)
}
