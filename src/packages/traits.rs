use crate::core::types::{PackageManagerType, PackageVersionInfo};
use crate::error::{Result, StackmatchError};
use crate::packages::runner::CancelToken;
use crate::ui;
use crate::version::{self, Version};
use std::collections::BTreeMap;

/// Capability set every native package-manager driver provides.
///
/// `AlreadyInstalled` and `NotFound` are soft errors: callers are expected to
/// match on them (see `StackmatchError::is_already_installed`).
pub trait Installer: Send + Sync {
    fn manager_type(&self) -> PackageManagerType;

    fn is_available(&self) -> bool;

    fn is_installed(&self, cancel: &CancelToken, package: &str) -> Result<bool>;

    /// Fails with `AlreadyInstalled` when the package is present.
    fn install_package(&self, cancel: &CancelToken, package: &str) -> Result<()>;

    /// Install several packages. Batch-capable managers issue one command.
    fn install_multiple(&self, cancel: &CancelToken, packages: &[String]) -> Result<()> {
        for package in packages {
            match self.install_package(cancel, package) {
                Err(e) if e.is_already_installed() => {
                    ui::debug(&format!("{} already installed, continuing", package));
                }
                other => other?,
            }
        }
        Ok(())
    }

    /// Remove a package. Succeeds without doing anything when it is absent.
    fn uninstall_package(&self, cancel: &CancelToken, package: &str) -> Result<()>;

    fn update_package_manager(&self, cancel: &CancelToken) -> Result<()>;

    /// Installed version, or an empty `installed_version` when absent.
    fn get_installed_version(
        &self,
        cancel: &CancelToken,
        package: &str,
    ) -> Result<PackageVersionInfo>;

    /// Versions the repositories can install, newest first where the manager
    /// reports an order.
    fn available_versions(&self, _cancel: &CancelToken, _package: &str) -> Result<Vec<String>> {
        Err(self.unsupported("listing available versions"))
    }

    /// Reduce a native version string (with epochs, distro revisions and
    /// the like) to something `Version::parse_lenient` can compare.
    fn comparable_version(&self, native: &str) -> String {
        native.to_string()
    }

    /// Install one concrete version.
    fn install_pinned(&self, _cancel: &CancelToken, _package: &str, _version: &str) -> Result<()> {
        Err(self.unsupported("installing a specific version"))
    }

    fn check_version(
        &self,
        cancel: &CancelToken,
        package: &str,
        constraint: &str,
    ) -> Result<PackageVersionInfo> {
        version::validate_constraint(constraint)?;
        let mut info = self.get_installed_version(cancel, package)?;
        info.constraint = constraint.to_string();
        info.satisfies_constraint = if info.is_installed() {
            installed_satisfies(&self.comparable_version(&info.installed_version), constraint)?
        } else {
            false
        };
        Ok(info)
    }

    /// Make sure some version satisfying `constraint` is installed. A
    /// package that already satisfies it is left alone.
    fn install_version(&self, cancel: &CancelToken, package: &str, constraint: &str) -> Result<()> {
        let current = self.check_version(cancel, package, constraint)?;
        if current.is_installed() && current.satisfies_constraint {
            ui::debug(&format!(
                "{} {} already satisfies '{}'",
                package, current.installed_version, constraint
            ));
            return Ok(());
        }

        if version::is_unconstrained(constraint) {
            return self.install_package(cancel, package);
        }

        let candidates = self.available_versions(cancel, package)?;
        let chosen = select_version(&candidates, constraint, |v| self.comparable_version(v))?
            .ok_or_else(|| StackmatchError::NoMatchingVersion {
                package: package.to_string(),
                constraint: constraint.to_string(),
            })?;
        self.install_pinned(cancel, package, &chosen)
    }

    /// Install a set of packages with per-package constraints (empty means
    /// any version). Stops at the first hard failure.
    fn install_multiple_versions(
        &self,
        cancel: &CancelToken,
        packages: &BTreeMap<String, String>,
    ) -> Result<()> {
        for (package, constraint) in packages {
            let result = if version::is_unconstrained(constraint) {
                self.install_package(cancel, package)
            } else {
                self.install_version(cancel, package, constraint)
            };
            match result {
                Err(e) if e.is_already_installed() => {}
                other => other?,
            }
        }
        Ok(())
    }

    fn unsupported(&self, operation: &str) -> StackmatchError {
        StackmatchError::UnsupportedOperation {
            manager: self.manager_type().display_name().to_string(),
            operation: operation.to_string(),
        }
    }
}

/// Whether an installed version string satisfies `constraint`. Absent or
/// unparseable versions never satisfy; a malformed constraint is an error.
pub fn installed_satisfies(installed: &str, constraint: &str) -> Result<bool> {
    if installed.is_empty() {
        version::validate_constraint(constraint)?;
        return Ok(false);
    }
    match Version::parse_lenient(installed) {
        Ok(parsed) => parsed.satisfies(constraint),
        Err(_) => {
            version::validate_constraint(constraint)?;
            ui::debug(&format!(
                "Cannot compare unparseable version '{}' against '{}'",
                installed, constraint
            ));
            Ok(false)
        }
    }
}

/// Pick the highest candidate satisfying `constraint`, comparing through
/// `normalize` but returning the native spelling. Candidates that do not
/// parse are skipped; ties keep the earliest entry.
pub fn select_version<F>(
    candidates: &[String],
    constraint: &str,
    normalize: F,
) -> Result<Option<String>>
where
    F: Fn(&str) -> String,
{
    version::validate_constraint(constraint)?;

    let mut best: Option<(Version, &String)> = None;
    for candidate in candidates {
        let Ok(parsed) = Version::parse_lenient(&normalize(candidate)) else {
            continue;
        };
        if !parsed.satisfies(constraint)? {
            continue;
        }
        let better = match &best {
            Some((current, _)) => parsed > *current,
            None => true,
        };
        if better {
            best = Some((parsed, candidate));
        }
    }

    Ok(best.map(|(_, raw)| raw.clone()))
}
