use crate::core::types::PackageManagerType;
use crate::environment::EnvironmentData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key holding the reason passed to `fail_installation`.
pub const FAILURE_REASON_KEY: &str = "failure_reason";
/// Metadata key holding the aggregated uninstall errors of a rollback.
pub const ROLLBACK_ERROR_KEY: &str = "rollback_error";

/// On-disk journal: every installation record ever started, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    #[serde(default)]
    pub meta: JournalMeta,
    #[serde(default)]
    pub installations: BTreeMap<String, InstallationRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalMeta {
    #[serde(default)]
    pub schema_version: u8,

    /// Monotonic revision, bumped on every write
    #[serde(default)]
    pub revision: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationStatus {
    InProgress,
    Completed,
    Failed,
    RollingBack,
    RolledBack,
    RollbackFailed,
}

impl InstallationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RollingBack => "rolling_back",
            Self::RolledBack => "rolled_back",
            Self::RollbackFailed => "rollback_failed",
        }
    }
}

impl fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a package when its installation was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RollbackOutcome {
    Uninstalled,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPackage {
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub manager_type: PackageManagerType,

    /// Insertion order within the record; rollback runs in reverse.
    #[serde(default)]
    pub sequence: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackOutcome>,
}

impl TrackedPackage {
    pub fn new(name: &str, version: &str, manager_type: PackageManagerType) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            manager_type,
            sequence: 0,
            rollback: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub packages: BTreeMap<String, TrackedPackage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentData>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub status: InstallationStatus,
}

impl InstallationRecord {
    pub fn new(id: String, environment: Option<EnvironmentData>) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            packages: BTreeMap::new(),
            environment,
            metadata: BTreeMap::new(),
            status: InstallationStatus::InProgress,
        }
    }

    /// Packages in the order they were added.
    pub fn packages_in_order(&self) -> Vec<&TrackedPackage> {
        let mut packages: Vec<&TrackedPackage> = self.packages.values().collect();
        packages.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.name.cmp(&b.name)));
        packages
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.packages
            .values()
            .map(|p| p.sequence + 1)
            .max()
            .unwrap_or(0)
    }
}
