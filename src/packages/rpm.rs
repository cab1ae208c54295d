//! DNF and YUM (Fedora, RHEL and derivatives)
//!
//! Both speak nearly the same CLI; the differences live in [`RpmFlavor`].

use crate::core::types::{PackageManagerType, PackageVersionInfo};
use crate::error::Result;
use crate::packages::context::{ManagerContext, argv, argv_with, strip_epoch_and_release};
use crate::packages::runner::{CancelToken, CommandRunner};
use crate::packages::traits::Installer;
use crate::utils::sanitize;
use std::sync::Arc;

const NOT_FOUND: &[&str] = &[
    "No match for argument",
    "Unable to find a match",
    "No package",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpmFlavor {
    Dnf,
    Yum,
}

impl RpmFlavor {
    fn kind(self) -> PackageManagerType {
        match self {
            Self::Dnf => PackageManagerType::Dnf,
            Self::Yum => PackageManagerType::Yum,
        }
    }

    fn installed_listing(self) -> &'static [&'static str] {
        match self {
            Self::Dnf => &["list", "--installed"],
            Self::Yum => &["list", "installed"],
        }
    }

    fn available_listing(self) -> &'static [&'static str] {
        match self {
            Self::Dnf => &["list", "--showduplicates", "--available"],
            Self::Yum => &["list", "available", "--showduplicates"],
        }
    }

    fn update(self) -> &'static [&'static str] {
        match self {
            Self::Dnf => &["upgrade", "-y"],
            Self::Yum => &["update", "-y"],
        }
    }
}

pub struct RpmInstaller {
    ctx: ManagerContext,
    flavor: RpmFlavor,
}

impl RpmInstaller {
    pub fn dnf(runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(RpmFlavor::Dnf, runner)
    }

    pub fn yum(runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(RpmFlavor::Yum, runner)
    }

    fn new(flavor: RpmFlavor, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            ctx: ManagerContext::new(flavor.kind(), runner),
            flavor,
        }
    }

    fn listing(
        &self,
        cancel: &CancelToken,
        base: &[&str],
        package: &str,
        header: &str,
    ) -> Result<Vec<(String, String)>> {
        sanitize::validate_package_name(package)?;
        let mut args = base.to_vec();
        args.push(package);
        let out = self.ctx.probe(cancel, &args)?;
        if !out.success {
            return Ok(Vec::new());
        }
        Ok(parse_listing(&out.stdout, package, header))
    }

    fn installed_entry(&self, cancel: &CancelToken, package: &str) -> Result<Option<String>> {
        Ok(self
            .listing(
                cancel,
                self.flavor.installed_listing(),
                package,
                "Installed Packages",
            )?
            .into_iter()
            .next()
            .map(|(_, version)| version))
    }
}

/// Rows of a `list` report belonging to `package`. Rows are `name.arch
/// version repo`; everything up to the section header is skipped (or just
/// the first line when no header is printed).
fn parse_listing(stdout: &str, package: &str, header: &str) -> Vec<(String, String)> {
    let lines: Vec<&str> = stdout.lines().collect();
    let start = lines
        .iter()
        .position(|line| line.trim() == header)
        .map_or(1, |idx| idx + 1);
    let arch_qualified = format!("{}.", package);

    lines
        .iter()
        .skip(start)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let version = fields.next()?;
            (name == package || name.starts_with(&arch_qualified))
                .then(|| (name.to_string(), version.to_string()))
        })
        .collect()
}

impl Installer for RpmInstaller {
    fn manager_type(&self) -> PackageManagerType {
        self.flavor.kind()
    }

    fn is_available(&self) -> bool {
        self.ctx.executable_available()
    }

    fn is_installed(&self, cancel: &CancelToken, package: &str) -> Result<bool> {
        Ok(self.installed_entry(cancel, package)?.is_some())
    }

    fn install_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        let installed = self.is_installed(cancel, package)?;
        self.ctx.ensure_absent(installed, package)?;
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["install", "-y", package]),
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
                &argv_with(&["install", "-y"], packages),
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
                &argv(&["remove", "-y", package]),
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
                &argv(self.flavor.update()),
                "installed packages",
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
        Ok(match self.installed_entry(cancel, package)? {
            Some(version) => PackageVersionInfo::installed(package, &version),
            None => PackageVersionInfo::absent(package),
        })
    }

    fn available_versions(&self, cancel: &CancelToken, package: &str) -> Result<Vec<String>> {
        let rows = self.listing(
            cancel,
            self.flavor.available_listing(),
            package,
            "Available Packages",
        )?;
        // Reports are oldest first.
        let mut versions: Vec<String> = Vec::new();
        for (_, version) in rows.into_iter().rev() {
            if !versions.contains(&version) {
                versions.push(version);
            }
        }
        Ok(versions)
    }

    fn comparable_version(&self, native: &str) -> String {
        strip_epoch_and_release(native)
    }

    /// `name-version` is how rpm tools select a specific build.
    fn install_pinned(&self, cancel: &CancelToken, package: &str, version: &str) -> Result<()> {
        sanitize::validate_package_name(package)?;
        sanitize::validate_version(version)?;
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["install", "-y", &format!("{}-{}", package, version)]),
                package,
                "install",
                NOT_FOUND,
            )
            .map(|_| ())
    }
}
