//! Scoop (Windows)

use crate::core::types::{PackageManagerType, PackageVersionInfo};
use crate::error::Result;
use crate::packages::context::{ManagerContext, argv, argv_with};
use crate::packages::runner::{CancelToken, CommandRunner};
use crate::packages::traits::Installer;
use crate::utils::sanitize;
use std::sync::Arc;

const NOT_FOUND: &[&str] = &["Couldn't find manifest"];

pub struct ScoopInstaller {
    ctx: ManagerContext,
}

impl ScoopInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            ctx: ManagerContext::new(PackageManagerType::Scoop, runner),
        }
    }

    /// Version column of the row for `package` in `scoop list`. A row made
    /// of just the name counts as installed with an unknown version.
    fn installed_row(&self, cancel: &CancelToken, package: &str) -> Result<Option<String>> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe(cancel, &["list"])?;
        if !out.success {
            return Ok(None);
        }
        Ok(out.stdout.lines().find_map(|line| {
            let mut fields = line.split_whitespace();
            (fields.next() == Some(package))
                .then(|| fields.next().unwrap_or_default().to_string())
        }))
    }
}

impl Installer for ScoopInstaller {
    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Scoop
    }

    fn is_available(&self) -> bool {
        self.ctx.executable_available()
    }

    fn is_installed(&self, cancel: &CancelToken, package: &str) -> Result<bool> {
        Ok(self.installed_row(cancel, package)?.is_some())
    }

    fn install_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        let installed = self.is_installed(cancel, package)?;
        self.ctx.ensure_absent(installed, package)?;
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["install", package]),
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
                &argv(&["uninstall", package]),
                package,
                "uninstall",
                &[],
            )
            .map(|_| ())
    }

    fn update_package_manager(&self, cancel: &CancelToken) -> Result<()> {
        self.ctx
            .execute_checked(cancel, &argv(&["update"]), "scoop", "update", &[])?;
        self.ctx
            .execute_checked(cancel, &argv(&["update", "*"]), "apps", "update", &[])?;
        Ok(())
    }

    fn get_installed_version(
        &self,
        cancel: &CancelToken,
        package: &str,
    ) -> Result<PackageVersionInfo> {
        Ok(match self.installed_row(cancel, package)? {
            Some(version) if !version.is_empty() => {
                PackageVersionInfo::installed(package, &version)
            }
            _ => PackageVersionInfo::absent(package),
        })
    }

    /// Scoop can fetch any version its manifest's autoupdate rules know how
    /// to build, but offers no way to list them; an exact constraint is the
    /// only thing it can be asked for.
    fn install_version(&self, cancel: &CancelToken, package: &str, constraint: &str) -> Result<()> {
        let current = self.check_version(cancel, package, constraint)?;
        if current.is_installed() && current.satisfies_constraint {
            return Ok(());
        }
        if crate::version::is_unconstrained(constraint) {
            return self.install_package(cancel, package);
        }

        let exact = constraint.trim().trim_start_matches('=').trim();
        if !crate::version::is_valid(exact) || exact.contains(['x', 'X', '*']) {
            return Err(self.unsupported(&format!(
                "installing {} matching '{}' (only exact versions can be requested)",
                package, constraint
            )));
        }
        sanitize::validate_version(exact)?;
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["install", &format!("{}@{}", package, exact)]),
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

    const LIST: &str = "Installed apps:\n\nName    Version  Source  Updated             Info\n----    -------  ------  -------             ----\ngit     2.43.0   main    2024-01-20 10:00:00\n7zip    23.01    main    2024-01-20 10:00:00\n";

    fn scoop(runner: FakeRunner) -> (ScoopInstaller, Arc<FakeRunner>) {
        let runner = Arc::new(runner);
        (ScoopInstaller::new(runner.clone()), runner)
    }

    #[test]
    fn installed_matches_whole_name_only() {
        let (driver, _) = scoop(FakeRunner::new().on("scoop list", ok(LIST)));
        assert!(driver.is_installed(&CancelToken::new(), "git").unwrap());
        assert!(!driver.is_installed(&CancelToken::new(), "gi").unwrap());
        assert_eq!(
            driver
                .get_installed_version(&CancelToken::new(), "7zip")
                .unwrap()
                .installed_version,
            "23.01"
        );
    }

    #[test]
    fn bare_name_lines_count_as_installed() {
        let (driver, _) = scoop(FakeRunner::new().on("scoop list", ok("git\nnodejs\n")));
        assert!(driver.is_installed(&CancelToken::new(), "nodejs").unwrap());
    }

    #[test]
    fn missing_manifest_is_not_found() {
        let (driver, _) = scoop(FakeRunner::new().on("scoop install", fail("Couldn't find manifest for 'nosuch'.")));
        assert!(driver
            .install_package(&CancelToken::new(), "nosuch")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn update_runs_twice() {
        let (driver, runner) = scoop(FakeRunner::new().on("scoop update", ok("")));
        driver.update_package_manager(&CancelToken::new()).unwrap();
        assert_eq!(runner.mutating_calls(), vec!["scoop update", "scoop update *"]);
    }

    #[test]
    fn exact_versions_use_at_syntax() {
        let (driver, runner) = scoop(FakeRunner::new().on("scoop install", ok("")));
        driver
            .install_version(&CancelToken::new(), "nodejs", "=20.11.0")
            .unwrap();
        assert_eq!(runner.mutating_calls(), vec!["scoop install nodejs@20.11.0"]);
    }

    #[test]
    fn ranges_are_unsupported() {
        let (driver, _) = scoop(FakeRunner::new());
        let err = driver
            .install_version(&CancelToken::new(), "nodejs", ">=20")
            .unwrap_err();
        assert!(matches!(err, crate::error::StackmatchError::UnsupportedOperation { .. }));
    }
}
