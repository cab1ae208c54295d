//! Winget (Windows Package Manager)
//!
//! Winget has no batch install, so `install_multiple` uses the sequential
//! default from [`Installer`].

use crate::core::types::{PackageManagerType, PackageVersionInfo};
use crate::error::Result;
use crate::packages::context::{ManagerContext, argv, non_empty_lines};
use crate::packages::runner::{CancelToken, CommandRunner};
use crate::packages::traits::Installer;
use crate::utils::sanitize;
use regex::Regex;
use std::sync::{Arc, LazyLock};

const NOT_FOUND: &[&str] = &["No package found matching input criteria"];
const AGREEMENTS: [&str; 3] = [
    "--silent",
    "--accept-package-agreements",
    "--accept-source-agreements",
];

static VERSION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?\d+(?:\.\d+)+").expect("Invalid regex pattern"));

pub struct WingetInstaller {
    ctx: ManagerContext,
}

impl WingetInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            ctx: ManagerContext::new(PackageManagerType::Winget, runner),
        }
    }

    /// Rows of `winget list --name <pkg>` mentioning the package; the header
    /// and separator lines are skipped.
    fn matching_rows(&self, cancel: &CancelToken, package: &str) -> Result<Vec<String>> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe(cancel, &["list", "--name", package])?;
        if !out.success {
            return Ok(Vec::new());
        }
        let needle = package.to_lowercase();
        Ok(out
            .stdout
            .lines()
            .skip(2)
            .filter(|line| line.to_lowercase().contains(&needle))
            .map(str::to_string)
            .collect())
    }

    fn install_args(package: &str, version: Option<&str>) -> Vec<String> {
        let mut args = argv(&["install"]);
        args.extend(AGREEMENTS.iter().map(|s| s.to_string()));
        if let Some(version) = version {
            args.push("--version".to_string());
            args.push(version.to_string());
        }
        args.push(package.to_string());
        args
    }
}

impl Installer for WingetInstaller {
    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Winget
    }

    fn is_available(&self) -> bool {
        self.ctx.executable_available()
    }

    fn is_installed(&self, cancel: &CancelToken, package: &str) -> Result<bool> {
        Ok(!self.matching_rows(cancel, package)?.is_empty())
    }

    fn install_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        let installed = self.is_installed(cancel, package)?;
        self.ctx.ensure_absent(installed, package)?;
        self.ctx
            .execute_checked(
                cancel,
                &Self::install_args(package, None),
                package,
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
                &argv(&["uninstall", "--silent", package]),
                package,
                "uninstall",
                &[],
            )
            .map(|_| ())
    }

    /// Winget updates itself through the store; make sure it runs, then
    /// upgrade everything it manages.
    fn update_package_manager(&self, cancel: &CancelToken) -> Result<()> {
        let probe = self.ctx.probe(cancel, &["--version"])?;
        self.ctx
            .check(probe, &argv(&["--version"]), "winget", "update", &[])?;

        let mut args = argv(&["upgrade", "--all"]);
        args.extend(AGREEMENTS.iter().map(|s| s.to_string()));
        self.ctx
            .execute_checked(cancel, &args, "installed packages", "upgrade", &[])
            .map(|_| ())
    }

    fn get_installed_version(
        &self,
        cancel: &CancelToken,
        package: &str,
    ) -> Result<PackageVersionInfo> {
        let rows = self.matching_rows(cancel, package)?;
        let version = rows.iter().find_map(|row| {
            row.split_whitespace()
                .skip(1)
                .find(|token| VERSION_TOKEN.is_match(token))
                .map(str::to_string)
        });
        Ok(match version {
            Some(version) => PackageVersionInfo::installed(package, &version),
            None => PackageVersionInfo::absent(package),
        })
    }

    fn available_versions(&self, cancel: &CancelToken, package: &str) -> Result<Vec<String>> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe(cancel, &["show", package, "--versions"])?;
        if !out.success {
            return Ok(Vec::new());
        }
        let lines: Vec<&str> = out.stdout.lines().collect();
        let start = lines
            .iter()
            .position(|line| line.trim_start().starts_with("---"))
            .map_or(0, |idx| idx + 1);
        Ok(non_empty_lines(&lines[start..].join("\n"), 0)
            .map(str::to_string)
            .collect())
    }

    fn install_pinned(&self, cancel: &CancelToken, package: &str, version: &str) -> Result<()> {
        sanitize::validate_package_name(package)?;
        sanitize::validate_version(version)?;
        self.ctx
            .execute_checked(
                cancel,
                &Self::install_args(package, Some(version)),
                package,
                "install",
                NOT_FOUND,
            )
            .map(|_| ())
    }
}
