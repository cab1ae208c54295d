//! APT (Debian, Ubuntu)
//!
//! Installs through `apt-get`, which has a stable scripting interface, and
//! probes installed state with `dpkg` / `dpkg-query`.

use crate::core::types::{PackageManagerType, PackageVersionInfo};
use crate::error::{Result, StackmatchError};
use crate::packages::context::{ManagerContext, argv, argv_with, strip_epoch_and_release};
use crate::packages::runner::{CancelToken, CommandRunner};
use crate::packages::traits::{Installer, select_version};
use crate::utils::sanitize;
use crate::version;
use std::collections::BTreeMap;
use std::sync::Arc;

const NOT_FOUND: &[&str] = &[
    "Unable to locate package",
    "has no installation candidate",
    "Couldn't find any package",
];

pub struct AptInstaller {
    ctx: ManagerContext,
}

impl AptInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            ctx: ManagerContext::new(PackageManagerType::Apt, runner),
        }
    }

    /// `dpkg -s` first; its status block is authoritative. Falls back to an
    /// `ii` row in `dpkg -l`.
    fn dpkg_reports_installed(&self, cancel: &CancelToken, package: &str) -> Result<bool> {
        let status = self.ctx.probe_with("dpkg", cancel, &["-s", package])?;
        if status.success && status.stdout.contains("Status: install ok installed") {
            return Ok(true);
        }

        let listing = self.ctx.probe_with("dpkg", cancel, &["-l", package])?;
        let arch_qualified = format!("{}:", package);
        Ok(listing.stdout.lines().any(|line| {
            let mut fields = line.split_whitespace();
            fields.next() == Some("ii")
                && fields
                    .next()
                    .is_some_and(|name| name == package || name.starts_with(&arch_qualified))
        }))
    }

    fn candidate_version(&self, cancel: &CancelToken, package: &str) -> Result<Option<String>> {
        let policy = self.ctx.probe_with("apt-cache", cancel, &["policy", package])?;
        if !policy.success {
            return Ok(None);
        }
        Ok(policy
            .stdout
            .lines()
            .filter_map(|line| line.trim().strip_prefix("Candidate:"))
            .map(str::trim)
            .find(|candidate| !candidate.is_empty() && *candidate != "(none)")
            .map(str::to_string))
    }
}

impl Installer for AptInstaller {
    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Apt
    }

    fn is_available(&self) -> bool {
        self.ctx.executable_available()
    }

    fn is_installed(&self, cancel: &CancelToken, package: &str) -> Result<bool> {
        sanitize::validate_package_name(package)?;
        self.dpkg_reports_installed(cancel, package)
    }

    fn install_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        let installed = self.is_installed(cancel, package)?;
        self.ctx.ensure_absent(installed, package)?;
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["install", "--assume-yes", package]),
                package,
                "install",
                NOT_FOUND,
            )
            .map(|_| ())
    }

    fn install_multiple(&self, cancel: &CancelToken, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        sanitize::validate_package_names(packages)?;
        self.ctx
            .execute_checked(
                cancel,
                &argv_with(&["install", "--assume-yes"], packages),
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
                &argv(&["remove", "--assume-yes", package]),
                package,
                "uninstall",
                &[],
            )
            .map(|_| ())
    }

    fn update_package_manager(&self, cancel: &CancelToken) -> Result<()> {
        self.ctx
            .execute_checked(cancel, &argv(&["update"]), "package index", "update", &[])?;
        self.ctx.execute_checked(
            cancel,
            &argv(&["upgrade", "--assume-yes"]),
            "installed packages",
            "upgrade",
            &[],
        )?;
        Ok(())
    }

    fn get_installed_version(
        &self,
        cancel: &CancelToken,
        package: &str,
    ) -> Result<PackageVersionInfo> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe_with(
            "dpkg-query",
            cancel,
            &["-W", "-f=${Version}\n${Status}\n", package],
        )?;
        if !out.success {
            return Ok(PackageVersionInfo::absent(package));
        }

        let mut lines = out.stdout.lines().map(str::trim);
        let version = lines.next().unwrap_or_default();
        let status = lines.next().unwrap_or_default();
        if version.is_empty() || !status.contains("install ok installed") {
            return Ok(PackageVersionInfo::absent(package));
        }

        let version = match version.rsplit_once('_') {
            Some((head, _)) if !head.is_empty() => head,
            _ => version,
        };

        let mut info = PackageVersionInfo::installed(package, version);
        info.latest_version = self.candidate_version(cancel, package)?;
        Ok(info)
    }

    fn available_versions(&self, cancel: &CancelToken, package: &str) -> Result<Vec<String>> {
        sanitize::validate_package_name(package)?;
        let out = self
            .ctx
            .probe_with("apt-cache", cancel, &["madison", package])?;
        if !out.success {
            return Ok(Vec::new());
        }

        let mut versions: Vec<String> = Vec::new();
        for line in out.stdout.lines() {
            if let Some(candidate) = line.split('|').nth(1).map(str::trim)
                && !candidate.is_empty()
                && !versions.iter().any(|v| v == candidate)
            {
                versions.push(candidate.to_string());
            }
        }
        Ok(versions)
    }

    fn comparable_version(&self, native: &str) -> String {
        strip_epoch_and_release(native)
    }

    fn install_pinned(&self, cancel: &CancelToken, package: &str, version: &str) -> Result<()> {
        sanitize::validate_package_name(package)?;
        sanitize::validate_version(version)?;
        self.ctx
            .execute_checked(
                cancel,
                &argv(&[
                    "install",
                    "--assume-yes",
                    "--allow-downgrades",
                    &format!("{}={}", package, version),
                ]),
                package,
                "install",
                NOT_FOUND,
            )
            .map(|_| ())
    }

    /// Resolve every constraint to a concrete `pkg=version` first, then
    /// install the whole set with one `apt-get` call.
    fn install_multiple_versions(
        &self,
        cancel: &CancelToken,
        packages: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut targets = Vec::with_capacity(packages.len());
        for (package, constraint) in packages {
            sanitize::validate_package_name(package)?;
            if version::is_unconstrained(constraint) {
                targets.push(package.clone());
                continue;
            }

            let current = self.check_version(cancel, package, constraint)?;
            if current.is_installed() && current.satisfies_constraint {
                continue;
            }

            let candidates = self.available_versions(cancel, package)?;
            let chosen = select_version(&candidates, constraint, strip_epoch_and_release)?
                .ok_or_else(|| StackmatchError::NoMatchingVersion {
                    package: package.clone(),
                    constraint: constraint.clone(),
                })?;
            targets.push(format!("{}={}", package, chosen));
        }

        if targets.is_empty() {
            return Ok(());
        }

        self.ctx
            .execute_checked(
                cancel,
                &argv_with(&["install", "--assume-yes", "--allow-downgrades"], &targets),
                &targets.join(" "),
                "install",
                NOT_FOUND,
            )
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::testing::{FakeRunner, fail, ok};

    const INSTALLED_STATUS: &str = "Package: git\nStatus: install ok installed\n";

    fn apt(runner: FakeRunner) -> (AptInstaller, Arc<FakeRunner>) {
        let runner = Arc::new(runner);
        (AptInstaller::new(runner.clone()), runner)
    }

    #[test]
    fn availability_follows_executable() {
        let (driver, _) = apt(FakeRunner::new().with_program("apt-get"));
        assert!(driver.is_available());
        let (driver, _) = apt(FakeRunner::new());
        assert!(!driver.is_available());
    }

    #[test]
    fn installed_via_dpkg_status() {
        let (driver, _) = apt(FakeRunner::new().on("dpkg -s git", ok(INSTALLED_STATUS)));
        assert!(driver.is_installed(&CancelToken::new(), "git").unwrap());
    }

    #[test]
    fn installed_via_dpkg_list_fallback() {
        let listing = "Desired=Unknown/Install\n||/ Name  Version  Arch\nii  git:amd64  1:2.43.0-1  amd64  fast vcs\n";
        let (driver, _) = apt(FakeRunner::new().on("dpkg -l git", ok(listing)));
        assert!(driver.is_installed(&CancelToken::new(), "git").unwrap());
    }

    #[test]
    fn removed_package_with_config_is_not_installed() {
        let listing = "rc  git  1:2.43.0-1  amd64  fast vcs\n";
        let (driver, _) = apt(
            FakeRunner::new()
                .on("dpkg -s git", ok("Status: deinstall ok config-files\n"))
                .on("dpkg -l git", ok(listing)),
        );
        assert!(!driver.is_installed(&CancelToken::new(), "git").unwrap());
    }

    #[test]
    fn install_refuses_installed_package() {
        let (driver, runner) = apt(FakeRunner::new().on("dpkg -s git", ok(INSTALLED_STATUS)));
        let err = driver.install_package(&CancelToken::new(), "git").unwrap_err();
        assert!(err.is_already_installed());
        assert!(runner.mutating_calls().is_empty());
    }

    #[test]
    fn install_issues_assume_yes() {
        let (driver, runner) = apt(FakeRunner::new().on("apt-get install", ok("done")));
        driver.install_package(&CancelToken::new(), "ripgrep").unwrap();
        assert_eq!(
            runner.mutating_calls(),
            vec!["apt-get install --assume-yes ripgrep"]
        );
    }

    #[test]
    fn unknown_package_maps_to_not_found() {
        let (driver, _) = apt(
            FakeRunner::new().on("apt-get install", fail("E: Unable to locate package nodejs\n")),
        );
        let err = driver.install_package(&CancelToken::new(), "nodejs").unwrap_err();
        assert!(matches!(err, StackmatchError::NotFound { ref package } if package == "nodejs"));
    }

    #[test]
    fn other_failures_carry_output() {
        let (driver, _) = apt(FakeRunner::new().on("apt-get install", fail("E: dpkg was interrupted")));
        let err = driver.install_package(&CancelToken::new(), "ripgrep").unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("dpkg was interrupted"));
    }

    #[test]
    fn install_multiple_is_one_command() {
        let (driver, runner) = apt(FakeRunner::new().on("apt-get install", ok("")));
        driver
            .install_multiple(&CancelToken::new(), &["git".to_string(), "curl".to_string()])
            .unwrap();
        assert_eq!(
            runner.mutating_calls(),
            vec!["apt-get install --assume-yes git curl"]
        );
    }

    #[test]
    fn uninstall_absent_package_is_noop() {
        let (driver, runner) = apt(FakeRunner::new());
        driver.uninstall_package(&CancelToken::new(), "git").unwrap();
        assert!(runner.mutating_calls().is_empty());
    }

    #[test]
    fn uninstall_removes_installed_package() {
        let (driver, runner) = apt(
            FakeRunner::new()
                .on("dpkg -s git", ok(INSTALLED_STATUS))
                .on("apt-get remove", ok("")),
        );
        driver.uninstall_package(&CancelToken::new(), "git").unwrap();
        assert_eq!(runner.mutating_calls(), vec!["apt-get remove --assume-yes git"]);
    }

    #[test]
    fn update_refreshes_then_upgrades() {
        let (driver, runner) = apt(
            FakeRunner::new()
                .on("apt-get update", ok(""))
                .on("apt-get upgrade", ok("")),
        );
        driver.update_package_manager(&CancelToken::new()).unwrap();
        assert_eq!(
            runner.mutating_calls(),
            vec!["apt-get update", "apt-get upgrade --assume-yes"]
        );
    }

    #[test]
    fn version_query_reads_dpkg_query() {
        let (driver, _) = apt(
            FakeRunner::new()
                .on("dpkg-query", ok("1:2.43.0-1ubuntu7\ninstall ok installed\n"))
                .on(
                    "apt-cache policy git",
                    ok("git:\n  Installed: 1:2.43.0-1ubuntu7\n  Candidate: 1:2.43.0-1ubuntu7.1\n"),
                ),
        );
        let info = driver.get_installed_version(&CancelToken::new(), "git").unwrap();
        assert_eq!(info.installed_version, "1:2.43.0-1ubuntu7");
        assert_eq!(info.latest_version.as_deref(), Some("1:2.43.0-1ubuntu7.1"));
    }

    #[test]
    fn version_query_for_absent_package_is_empty() {
        let (driver, _) = apt(FakeRunner::new().on(
            "dpkg-query",
            fail("dpkg-query: no packages found matching git\n"),
        ));
        let info = driver.get_installed_version(&CancelToken::new(), "git").unwrap();
        assert!(!info.is_installed());
    }

    #[test]
    fn check_version_compares_upstream_part() {
        let (driver, _) = apt(
            FakeRunner::new().on("dpkg-query", ok("1:2.43.0-1ubuntu7\ninstall ok installed\n")),
        );
        let info = driver
            .check_version(&CancelToken::new(), "git", ">=2.40")
            .unwrap();
        assert!(info.satisfies_constraint);
        let info = driver
            .check_version(&CancelToken::new(), "git", "2.43.0")
            .unwrap();
        assert!(info.satisfies_constraint);
    }

    #[test]
    fn check_version_rejects_malformed_constraint() {
        let (driver, _) = apt(FakeRunner::new());
        assert!(driver
            .check_version(&CancelToken::new(), "git", ">=not-a-version")
            .is_err());
    }

    #[test]
    fn install_version_pins_best_candidate() {
        let madison = " nodejs | 20.11.1-1nodesource1 | https://deb.nodesource.com\n nodejs | 18.19.0-1nodesource1 | https://deb.nodesource.com\n";
        let (driver, runner) = apt(
            FakeRunner::new()
                .on("apt-cache madison nodejs", ok(madison))
                .on("apt-get install", ok("")),
        );
        driver
            .install_version(&CancelToken::new(), "nodejs", "18.x")
            .unwrap();
        assert_eq!(
            runner.mutating_calls(),
            vec!["apt-get install --assume-yes --allow-downgrades nodejs=18.19.0-1nodesource1"]
        );
    }

    #[test]
    fn install_version_is_idempotent_when_satisfied() {
        let (driver, runner) = apt(
            FakeRunner::new().on("dpkg-query", ok("20.11.1-1\ninstall ok installed\n")),
        );
        driver
            .install_version(&CancelToken::new(), "nodejs", ">=20")
            .unwrap();
        assert!(runner.mutating_calls().is_empty());
    }

    #[test]
    fn install_version_without_candidate_fails() {
        let (driver, _) = apt(
            FakeRunner::new().on("apt-cache madison", ok(" nodejs | 12.22.9-1 | http://archive\n")),
        );
        let err = driver
            .install_version(&CancelToken::new(), "nodejs", ">=18")
            .unwrap_err();
        assert!(matches!(err, StackmatchError::NoMatchingVersion { .. }));
    }

    #[test]
    fn install_multiple_versions_batches_resolved_targets() {
        let madison = " nodejs | 20.11.1-1 | http://archive\n";
        let (driver, runner) = apt(
            FakeRunner::new()
                .on("apt-cache madison nodejs", ok(madison))
                .on("apt-get install", ok("")),
        );
        let mut wanted = BTreeMap::new();
        wanted.insert("curl".to_string(), String::new());
        wanted.insert("nodejs".to_string(), "20.x".to_string());
        driver
            .install_multiple_versions(&CancelToken::new(), &wanted)
            .unwrap();
        assert_eq!(
            runner.mutating_calls(),
            vec!["apt-get install --assume-yes --allow-downgrades curl nodejs=20.11.1-1"]
        );
    }

    #[test]
    fn option_like_names_are_rejected_before_running() {
        let (driver, runner) = apt(FakeRunner::new());
        assert!(driver.install_package(&CancelToken::new(), "--purge").is_err());
        assert!(runner.calls().is_empty());
    }
}
