use crate::error::{Result, StackmatchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Supported native package managers.
// To add one: add a variant here, a driver under packages/, and an entry in
// InstallerRegistry::register_defaults.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerType {
    Apt,
    Dnf,
    Yum,
    Pacman,
    Snap,
    Homebrew,
    Chocolatey,
    Scoop,
    Winget,
}

impl PackageManagerType {
    pub const ALL: [PackageManagerType; 9] = [
        Self::Apt,
        Self::Dnf,
        Self::Yum,
        Self::Pacman,
        Self::Snap,
        Self::Homebrew,
        Self::Chocolatey,
        Self::Scoop,
        Self::Winget,
    ];

    /// Stable lowercase identifier used in the journal and config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Snap => "snap",
            Self::Homebrew => "homebrew",
            Self::Chocolatey => "chocolatey",
            Self::Scoop => "scoop",
            Self::Winget => "winget",
        }
    }

    /// Human-facing name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Apt => "APT",
            Self::Dnf => "DNF",
            Self::Yum => "YUM",
            Self::Pacman => "Pacman",
            Self::Snap => "Snap",
            Self::Homebrew => "Homebrew",
            Self::Chocolatey => "Chocolatey",
            Self::Scoop => "Scoop",
            Self::Winget => "Winget",
        }
    }

    /// Executable whose presence on PATH means the manager is usable.
    pub fn executable(&self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Snap => "snap",
            Self::Homebrew => "brew",
            Self::Chocolatey => "choco",
            Self::Scoop => "scoop",
            Self::Winget => "winget",
        }
    }
}

impl fmt::Display for PackageManagerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageManagerType {
    type Err = StackmatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "apt" | "apt-get" => Ok(Self::Apt),
            "dnf" => Ok(Self::Dnf),
            "yum" => Ok(Self::Yum),
            "pacman" => Ok(Self::Pacman),
            "snap" => Ok(Self::Snap),
            "homebrew" | "brew" => Ok(Self::Homebrew),
            "chocolatey" | "choco" => Ok(Self::Chocolatey),
            "scoop" => Ok(Self::Scoop),
            "winget" => Ok(Self::Winget),
            other => Err(StackmatchError::ConfigError(format!(
                "Unknown package manager '{}'",
                other
            ))),
        }
    }
}

/// Result of a version probe plus constraint evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersionInfo {
    pub name: String,
    /// Empty when the package is not installed.
    pub installed_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    pub satisfies_constraint: bool,
    #[serde(default)]
    pub constraint: String,
}

impl PackageVersionInfo {
    pub fn absent(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn installed(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            installed_version: version.to_string(),
            ..Default::default()
        }
    }

    pub fn is_installed(&self) -> bool {
        !self.installed_version.is_empty()
    }
}

/// A logical package plus an optional version constraint, written
/// `name` or `name@constraint` on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    pub name: String,
    pub constraint: Option<String>,
}

impl PackageRequest {
    pub fn new(name: &str, constraint: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            constraint: constraint
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        }
    }
}

impl FromStr for PackageRequest {
    type Err = StackmatchError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, constraint) = match s.split_once('@') {
            Some((name, constraint)) => (name, Some(constraint)),
            None => (s, None),
        };
        if name.is_empty() {
            return Err(StackmatchError::ConfigError(format!(
                "Invalid package request '{}'",
                s
            )));
        }
        Ok(Self::new(name, constraint))
    }
}

impl fmt::Display for PackageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{}@{}", self.name, c),
            None => f.write_str(&self.name),
        }
    }
}
