use crate::core::types::PackageRequest;
use crate::environment::scanner;
use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value recorded for an executable that exists but whose version could
/// not be read.
pub const UNKNOWN_VERSION: &str = "Installed";

/// Snapshot of a developer machine: what is installed and at which
/// version. Maps are keyed by display name ("Node.js", "Git").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentData {
    pub stackmatch_version: String,
    pub scan_date: DateTime<Utc>,
    pub system: SystemInfo,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tools: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub package_managers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub code_editors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configured_languages: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub shell: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
}

impl EnvironmentData {
    pub fn new(system: SystemInfo) -> Self {
        Self {
            stackmatch_version: env!("CARGO_PKG_VERSION").to_string(),
            scan_date: Utc::now(),
            system,
            tools: BTreeMap::new(),
            package_managers: BTreeMap::new(),
            code_editors: BTreeMap::new(),
            configured_languages: BTreeMap::new(),
            config_files: Vec::new(),
        }
    }

    /// Every detected entry as `(display name, version)`, languages first.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.configured_languages
            .iter()
            .chain(&self.tools)
            .chain(&self.code_editors)
            .chain(&self.package_managers)
            .map(|(name, version)| (name.as_str(), version.as_str()))
    }

    /// Logical packages that would recreate this snapshot. With `pin`, each
    /// request is constrained to the recorded version when it is readable.
    /// Entries without a known package are skipped, and a logical package
    /// is requested once.
    pub fn installable_packages(&self, pin: bool) -> Vec<PackageRequest> {
        let mut requests: Vec<PackageRequest> = Vec::new();
        for (name, version) in self.entries() {
            let Some(package) = scanner::package_for(name) else {
                continue;
            };
            if requests.iter().any(|r| r.name == package) {
                continue;
            }
            let constraint = (pin && version != UNKNOWN_VERSION && Version::parse(version).is_ok())
                .then(|| format!("={}", version));
            requests.push(PackageRequest::new(package, constraint.as_deref()));
        }
        requests
    }
}
