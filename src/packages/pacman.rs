//! Pacman (Arch Linux)

use crate::core::types::{PackageManagerType, PackageVersionInfo};
use crate::error::Result;
use crate::packages::context::{ManagerContext, argv, argv_with, strip_epoch_and_release};
use crate::packages::runner::{CancelToken, CommandRunner};
use crate::packages::traits::Installer;
use crate::utils::sanitize;
use std::sync::Arc;

const NOT_FOUND: &[&str] = &["target not found"];

pub struct PacmanInstaller {
    ctx: ManagerContext,
}

impl PacmanInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            ctx: ManagerContext::new(PackageManagerType::Pacman, runner),
        }
    }
}

impl Installer for PacmanInstaller {
    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Pacman
    }

    fn is_available(&self) -> bool {
        self.ctx.executable_available()
    }

    fn is_installed(&self, cancel: &CancelToken, package: &str) -> Result<bool> {
        sanitize::validate_package_name(package)?;
        let pattern = format!("^{}$", regex::escape(package));
        let out = self.ctx.probe(cancel, &["-Qs", &pattern])?;
        Ok(out.success && !out.stdout.trim().is_empty())
    }

    fn install_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        let installed = self.is_installed(cancel, package)?;
        self.ctx.ensure_absent(installed, package)?;
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["-S", "--noconfirm", package]),
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
                &argv_with(&["-S", "--noconfirm"], packages),
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
                &argv(&["-R", "--noconfirm", package]),
                package,
                "uninstall",
                &[],
            )
            .map(|_| ())
    }

    fn update_package_manager(&self, cancel: &CancelToken) -> Result<()> {
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["-Syu", "--noconfirm"]),
                "system",
                "upgrade",
                &[],
            )
            .map(|_| ())
    }

    fn get_installed_version(
        &self,
        cancel: &CancelToken,
        package: &str,
    ) -> Result<PackageVersionInfo> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe(cancel, &["-Q", package])?;
        if !out.success {
            return Ok(PackageVersionInfo::absent(package));
        }
        Ok(out
            .stdout
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                (fields.next() == Some(package)).then(|| fields.next()).flatten()
            })
            .next()
            .map(|version| PackageVersionInfo::installed(package, version))
            .unwrap_or_else(|| PackageVersionInfo::absent(package)))
    }

    /// Sync repositories carry exactly one version of each package.
    fn available_versions(&self, cancel: &CancelToken, package: &str) -> Result<Vec<String>> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe(cancel, &["-Si", package])?;
        if !out.success {
            return Ok(Vec::new());
        }
        Ok(out
            .stdout
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                (key.trim() == "Version").then(|| value.trim().to_string())
            })
            .take(1)
            .collect())
    }

    fn comparable_version(&self, native: &str) -> String {
        strip_epoch_and_release(native)
    }

    fn install_pinned(&self, cancel: &CancelToken, package: &str, version: &str) -> Result<()> {
        sanitize::validate_version(version)?;
        let offered = self.available_versions(cancel, package)?;
        if !offered.iter().any(|v| v == version) {
            return Err(self.unsupported(&format!(
                "installing {} {} (repositories offer {})",
                package,
                version,
                offered.first().map_or("nothing", String::as_str)
            )));
        }
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["-S", "--noconfirm", package]),
                package,
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

    fn pacman(runner: FakeRunner) -> (PacmanInstaller, Arc<FakeRunner>) {
        let runner = Arc::new(runner);
        (PacmanInstaller::new(runner.clone()), runner)
    }

    #[test]
    fn search_output_means_installed() {
        let (driver, runner) = pacman(
            FakeRunner::new().on("pacman -Qs", ok("local/git 2.43.0-1\n    the fast distributed vcs\n")),
        );
        assert!(driver.is_installed(&CancelToken::new(), "git").unwrap());
        assert_eq!(runner.calls(), vec!["pacman -Qs ^git$"]);
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        let (driver, runner) = pacman(FakeRunner::new());
        assert!(!driver.is_installed(&CancelToken::new(), "g++").unwrap());
        assert_eq!(runner.calls(), vec![r"pacman -Qs ^g\+\+$"]);
    }

    #[test]
    fn install_uses_noconfirm() {
        let (driver, runner) = pacman(FakeRunner::new().on("pacman -S ", ok("")));
        driver.install_package(&CancelToken::new(), "ripgrep").unwrap();
        assert_eq!(runner.mutating_calls(), vec!["pacman -S --noconfirm ripgrep"]);
    }

    #[test]
    fn missing_target_is_not_found() {
        let (driver, _) = pacman(FakeRunner::new().on("pacman -S ", fail("error: target not found: nosuch\n")));
        assert!(driver
            .install_package(&CancelToken::new(), "nosuch")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn version_from_query() {
        let (driver, _) = pacman(FakeRunner::new().on("pacman -Q git", ok("git 2.43.0-1\n")));
        let info = driver.check_version(&CancelToken::new(), "git", ">=2.40").unwrap();
        assert_eq!(info.installed_version, "2.43.0-1");
        assert!(info.satisfies_constraint);
    }

    #[test]
    fn pinned_install_only_for_repo_version() {
        let info = "Repository      : extra\nName            : nodejs\nVersion         : 21.6.1-1\n";
        let (driver, runner) = pacman(
            FakeRunner::new()
                .on("pacman -Si nodejs", ok(info))
                .on("pacman -S ", ok("")),
        );
        driver
            .install_version(&CancelToken::new(), "nodejs", ">=21")
            .unwrap();
        assert_eq!(runner.mutating_calls(), vec!["pacman -S --noconfirm nodejs"]);

        let err = driver
            .install_version(&CancelToken::new(), "nodejs", "<20")
            .unwrap_err();
        assert!(matches!(err, crate::error::StackmatchError::NoMatchingVersion { .. }));
    }

    #[test]
    fn update_is_full_sync() {
        let (driver, runner) = pacman(FakeRunner::new().on("pacman -Syu", ok("")));
        driver.update_package_manager(&CancelToken::new()).unwrap();
        assert_eq!(runner.mutating_calls(), vec!["pacman -Syu --noconfirm"]);
    }
}
