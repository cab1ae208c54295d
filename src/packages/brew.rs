//! Homebrew package manager
//!
//! Installs and manages formulae using Homebrew. Older releases are only
//! reachable through versioned formulae (`node@18`), so pinning picks
//! between the stable formula and those.

use crate::core::types::{PackageManagerType, PackageVersionInfo};
use crate::error::Result;
use crate::packages::context::{ManagerContext, argv, argv_with};
use crate::packages::runner::{CancelToken, CommandRunner};
use crate::packages::traits::Installer;
use crate::ui;
use crate::utils::sanitize;
use serde::Deserialize;
use std::sync::Arc;

const NOT_FOUND: &[&str] = &[
    "No available formula or cask",
    "No available formula",
    "No formulae or casks found",
];

pub struct BrewInstaller {
    ctx: ManagerContext,
}

#[derive(Debug, Default, Deserialize)]
struct BrewInfo {
    #[serde(default)]
    formulae: Vec<FormulaInfo>,
    #[serde(default)]
    casks: Vec<CaskInfo>,
}

#[derive(Debug, Deserialize)]
struct FormulaInfo {
    versions: FormulaVersions,
    #[serde(default)]
    versioned_formulae: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FormulaVersions {
    stable: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaskInfo {
    version: Option<String>,
}

/// What a formula name can install.
#[derive(Debug, Default, PartialEq, Eq)]
struct Offer {
    stable: Option<String>,
    /// Suffixes of versioned formulae, e.g. `18` for `node@18`.
    versioned: Vec<String>,
}

impl BrewInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            ctx: ManagerContext::new(PackageManagerType::Homebrew, runner),
        }
    }

    fn offer(&self, cancel: &CancelToken, package: &str) -> Result<Offer> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe(cancel, &["info", "--json=v2", package])?;
        if !out.success {
            return Ok(Offer::default());
        }
        match serde_json::from_str::<BrewInfo>(&out.stdout) {
            Ok(info) => Ok(parse_offer(info, package)),
            Err(e) => {
                ui::debug(&format!("Unreadable brew info for {}: {}", package, e));
                Ok(Offer::default())
            }
        }
    }

    fn install_formula(&self, cancel: &CancelToken, formula: &str, package: &str) -> Result<()> {
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["install", formula]),
                package,
                "install",
                NOT_FOUND,
            )
            .map(|_| ())
    }
}

fn parse_offer(info: BrewInfo, package: &str) -> Offer {
    if let Some(formula) = info.formulae.into_iter().next() {
        let prefix = format!("{}@", package);
        return Offer {
            stable: formula.versions.stable,
            versioned: formula
                .versioned_formulae
                .iter()
                .filter_map(|name| name.strip_prefix(&prefix))
                .map(str::to_string)
                .collect(),
        };
    }
    Offer {
        stable: info.casks.into_iter().next().and_then(|c| c.version),
        versioned: Vec::new(),
    }
}

impl Installer for BrewInstaller {
    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Homebrew
    }

    fn is_available(&self) -> bool {
        self.ctx.executable_available()
    }

    fn is_installed(&self, cancel: &CancelToken, package: &str) -> Result<bool> {
        Ok(self.get_installed_version(cancel, package)?.is_installed())
    }

    fn install_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        let installed = self.is_installed(cancel, package)?;
        self.ctx.ensure_absent(installed, package)?;
        self.install_formula(cancel, package, package)
    }

    fn install_multiple(&self, cancel: &CancelToken, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        sanitize::validate_package_names(packages)?;
        self.ctx
            .execute_checked(
                cancel,
                &argv_with(&["install"], packages),
                &packages.join(" "),
                "install",
                NOT_FOUND,
            )
            .map(|_| ())
    }

    fn uninstall_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        if !self.is_installed(cancel, package)? {
            return Ok(());
        }
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["uninstall", "--ignore-dependencies", package]),
                package,
                "uninstall",
                &[],
            )
            .map(|_| ())
    }

    fn update_package_manager(&self, cancel: &CancelToken) -> Result<()> {
        self.ctx
            .execute_checked(cancel, &argv(&["update"]), "Homebrew", "update", &[])
            .map(|_| ())
    }

    fn get_installed_version(
        &self,
        cancel: &CancelToken,
        package: &str,
    ) -> Result<PackageVersionInfo> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe(cancel, &["list", "--versions", package])?;
        let combined = out.combined();
        if !out.success || combined.contains("No such keg") || combined.contains("No available formula") {
            return Ok(PackageVersionInfo::absent(package));
        }

        // brew list --versions: "node 21.6.1 20.11.0"
        Ok(out
            .stdout
            .lines()
            .find_map(|line| line.split_whitespace().nth(1))
            .map(|version| PackageVersionInfo::installed(package, version))
            .unwrap_or_else(|| PackageVersionInfo::absent(package)))
    }

    fn available_versions(&self, cancel: &CancelToken, package: &str) -> Result<Vec<String>> {
        let offer = self.offer(cancel, package)?;
        Ok(offer.stable.into_iter().chain(offer.versioned).collect())
    }

    /// Drop the bottle revision (`21.6.1_1`).
    fn comparable_version(&self, native: &str) -> String {
        native.split('_').next().unwrap_or(native).to_string()
    }

    fn install_pinned(&self, cancel: &CancelToken, package: &str, version: &str) -> Result<()> {
        let offer = self.offer(cancel, package)?;
        if offer.stable.as_deref() == Some(version) {
            return self.install_formula(cancel, package, package);
        }
        if offer.versioned.iter().any(|v| v == version) {
            let formula = format!("{}@{}", package, version);
            sanitize::validate_package_name(&formula)?;
            return self.install_formula(cancel, &formula, package);
        }
        Err(self.unsupported(&format!(
            "installing {} {} (no matching formula)",
            package, version
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::testing::{FakeRunner, fail, ok};

    const NODE_INFO: &str = r#"{"formulae":[{"name":"node","versions":{"stable":"21.6.1","head":"HEAD","bottle":true},"versioned_formulae":["node@20","node@18"]}],"casks":[]}"#;

    fn brew(runner: FakeRunner) -> (BrewInstaller, Arc<FakeRunner>) {
        let runner = Arc::new(runner);
        (BrewInstaller::new(runner.clone()), runner)
    }

    #[test]
    fn list_versions_drives_installed_state() {
        let (driver, _) = brew(FakeRunner::new().on("brew list --versions node", ok("node 21.6.1_1 20.11.0\n")));
        let info = driver.get_installed_version(&CancelToken::new(), "node").unwrap();
        assert_eq!(info.installed_version, "21.6.1_1");
        assert!(driver.is_installed(&CancelToken::new(), "node").unwrap());

        let (driver, _) = brew(FakeRunner::new().on("brew list --versions", fail("Error: No such keg: /opt/homebrew/Cellar/jq")));
        assert!(!driver.is_installed(&CancelToken::new(), "jq").unwrap());
    }

    #[test]
    fn missing_formula_is_not_found() {
        let (driver, _) = brew(FakeRunner::new().on(
            "brew install",
            fail("Warning: No available formula with the name \"nosuch\".\nError: No available formula or cask with the name \"nosuch\"."),
        ));
        assert!(driver
            .install_package(&CancelToken::new(), "nosuch")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn uninstall_ignores_dependencies() {
        let (driver, runner) = brew(
            FakeRunner::new()
                .on("brew list --versions jq", ok("jq 1.7.1\n"))
                .on("brew uninstall", ok("")),
        );
        driver.uninstall_package(&CancelToken::new(), "jq").unwrap();
        assert_eq!(
            runner.mutating_calls(),
            vec!["brew uninstall --ignore-dependencies jq"]
        );
    }

    #[test]
    fn offer_lists_stable_and_versioned() {
        let info: BrewInfo = serde_json::from_str(NODE_INFO).unwrap();
        assert_eq!(
            parse_offer(info, "node"),
            Offer {
                stable: Some("21.6.1".to_string()),
                versioned: vec!["20".to_string(), "18".to_string()],
            }
        );
    }

    #[test]
    fn pinning_old_major_installs_versioned_formula() {
        let (driver, runner) = brew(
            FakeRunner::new()
                .on("brew info --json=v2 node", ok(NODE_INFO))
                .on("brew install", ok("")),
        );
        driver
            .install_version(&CancelToken::new(), "node", "18.x")
            .unwrap();
        assert_eq!(runner.mutating_calls(), vec!["brew install node@18"]);
    }

    #[test]
    fn pinning_current_release_installs_plain_formula() {
        let (driver, runner) = brew(
            FakeRunner::new()
                .on("brew info --json=v2 node", ok(NODE_INFO))
                .on("brew install", ok("")),
        );
        driver
            .install_version(&CancelToken::new(), "node", ">=21")
            .unwrap();
        assert_eq!(runner.mutating_calls(), vec!["brew install node"]);
    }

    #[test]
    fn bottle_revision_is_ignored_in_checks() {
        let (driver, _) = brew(FakeRunner::new().on("brew list --versions node", ok("node 21.6.1_1\n")));
        let info = driver.check_version(&CancelToken::new(), "node", "21.6.1").unwrap();
        assert!(info.satisfies_constraint);
    }
}
