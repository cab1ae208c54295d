//! Chocolatey (Windows)

use crate::core::types::{PackageManagerType, PackageVersionInfo};
use crate::error::Result;
use crate::packages::context::{ManagerContext, argv, non_empty_lines};
use crate::packages::runner::{CancelToken, CommandRunner};
use crate::packages::traits::Installer;
use crate::utils::sanitize;
use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;

const NOT_FOUND: &[&str] = &[
    "was not found with the source",
    "The package was not found",
];

static VERSION_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+(?:\.\d+)*(?:-[\w.]+)?$").expect("Invalid regex pattern")
});

pub struct ChocolateyInstaller {
    ctx: ManagerContext,
}

impl ChocolateyInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            ctx: ManagerContext::new(PackageManagerType::Chocolatey, runner),
        }
    }
}

/// Versions listed for `package` in `choco list` / `choco search` output.
/// Handles both `name version` and `--limit-output` style `name|version`
/// rows; the banner line is skipped.
fn versions_for(output: &str, package: &str) -> Vec<String> {
    non_empty_lines(output, 1)
        .filter_map(|line| {
            let mut fields = line.split(|c: char| c.is_whitespace() || c == '|');
            let name = fields.next()?;
            let version = fields.find(|f| !f.is_empty())?;
            (name.eq_ignore_ascii_case(package) && VERSION_FIELD.is_match(version))
                .then(|| version.to_string())
        })
        .collect()
}

impl Installer for ChocolateyInstaller {
    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Chocolatey
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
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["install", package, "--yes"]),
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
        let mut args = vec!["install".to_string()];
        args.extend(packages.iter().cloned());
        args.push("--yes".to_string());
        self.ctx
            .execute_checked(cancel, &args, &packages.join(" "), "install", NOT_FOUND)
            .map(|_| ())
    }

    fn uninstall_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        if !self.is_installed(cancel, package)? {
            return Ok(());
        }
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["uninstall", package, "--yes"]),
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
                &argv(&["upgrade", "chocolatey", "--yes"]),
                "chocolatey",
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
        let out = self.ctx.probe(cancel, &["list", "--local-only", "--exact", package])?;
        let combined = out.combined();
        if !out.success || combined.contains("The package was not found") {
            return Ok(PackageVersionInfo::absent(package));
        }
        Ok(versions_for(&out.stdout, package)
            .into_iter()
            .next()
            .map(|version| PackageVersionInfo::installed(package, &version))
            .unwrap_or_else(|| PackageVersionInfo::absent(package)))
    }

    fn available_versions(&self, cancel: &CancelToken, package: &str) -> Result<Vec<String>> {
        sanitize::validate_package_name(package)?;
        let out = self
            .ctx
            .probe(cancel, &["search", package, "--exact", "--all-versions"])?;
        if !out.success {
            return Ok(Vec::new());
        }
        Ok(versions_for(&out.stdout, package))
    }

    fn install_pinned(&self, cancel: &CancelToken, package: &str, version: &str) -> Result<()> {
        sanitize::validate_package_name(package)?;
        sanitize::validate_version(version)?;
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["install", package, "--version", version, "--yes"]),
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

    fn choco(runner: FakeRunner) -> (ChocolateyInstaller, Arc<FakeRunner>) {
        let runner = Arc::new(runner);
        (ChocolateyInstaller::new(runner.clone()), runner)
    }

    #[test]
    fn local_list_is_case_insensitive() {
        let listing = "Chocolatey v2.2.2\nGit 2.43.0\ngit.install 2.43.0\n2 packages installed.\n";
        let (driver, runner) = choco(FakeRunner::new().on("choco list", ok(listing)));
        let info = driver.get_installed_version(&CancelToken::new(), "git").unwrap();
        assert_eq!(info.installed_version, "2.43.0");
        assert_eq!(runner.calls(), vec!["choco list --local-only --exact git"]);
    }

    #[test]
    fn banner_line_is_never_a_package() {
        let (driver, _) = choco(FakeRunner::new().on("choco list", ok("Chocolatey 2.2.2\n0 packages installed.\n")));
        assert!(!driver.is_installed(&CancelToken::new(), "chocolatey").unwrap());
    }

    #[test]
    fn limit_output_rows_parse() {
        assert_eq!(
            versions_for("banner\nnodejs|21.6.1\nnodejs|20.11.0\n", "nodejs"),
            vec!["21.6.1", "20.11.0"]
        );
    }

    #[test]
    fn install_puts_yes_last() {
        let (driver, runner) = choco(FakeRunner::new().on("choco install", ok("")));
        driver.install_package(&CancelToken::new(), "git").unwrap();
        assert_eq!(runner.mutating_calls(), vec!["choco install git --yes"]);

        driver
            .install_multiple(&CancelToken::new(), &["git".to_string(), "7zip".to_string()])
            .unwrap();
        assert_eq!(
            runner.mutating_calls().last().map(String::as_str),
            Some("choco install git 7zip --yes")
        );
    }

    #[test]
    fn missing_package_is_not_found() {
        let (driver, _) = choco(FakeRunner::new().on(
            "choco install",
            fail("nosuch not installed. The package was not found with the source(s) listed."),
        ));
        assert!(driver
            .install_package(&CancelToken::new(), "nosuch")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn pinned_install_passes_version_flag() {
        let search = "Chocolatey v2.2.2\nnodejs 21.6.1 [Approved]\nnodejs 20.11.0 [Approved]\nnodejs 18.19.0 [Approved]\n3 packages found.\n";
        let (driver, runner) = choco(
            FakeRunner::new()
                .on("choco search nodejs", ok(search))
                .on("choco install", ok("")),
        );
        driver
            .install_version(&CancelToken::new(), "nodejs", "<21")
            .unwrap();
        assert_eq!(
            runner.mutating_calls(),
            vec!["choco install nodejs --version 20.11.0 --yes"]
        );
    }

    #[test]
    fn update_upgrades_chocolatey_itself() {
        let (driver, runner) = choco(FakeRunner::new().on("choco upgrade", ok("")));
        driver.update_package_manager(&CancelToken::new()).unwrap();
        assert_eq!(runner.mutating_calls(), vec!["choco upgrade chocolatey --yes"]);
    }
}
