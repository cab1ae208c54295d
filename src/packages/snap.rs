//! Snap
//!
//! Classic confinement is tried first since most developer tools need it;
//! strictly confined snaps reject `--classic`, so the plain form is the
//! fallback. Versions are pinned by installing from the channel that
//! currently publishes them.

use crate::core::types::{PackageManagerType, PackageVersionInfo};
use crate::error::Result;
use crate::packages::context::{ManagerContext, argv, argv_with};
use crate::packages::runner::{CancelToken, CommandRunner};
use crate::packages::traits::Installer;
use crate::ui;
use crate::utils::sanitize;
use std::sync::Arc;

const NOT_FOUND: &[&str] = &["not found"];

pub struct SnapInstaller {
    ctx: ManagerContext,
}

impl SnapInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            ctx: ManagerContext::new(PackageManagerType::Snap, runner),
        }
    }

    /// `(channel, version)` pairs from `snap info`, in the order listed.
    fn channels(&self, cancel: &CancelToken, package: &str) -> Result<Vec<(String, String)>> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe(cancel, &["info", package])?;
        if !out.success {
            return Ok(Vec::new());
        }
        Ok(parse_channels(&out.stdout))
    }
}

fn parse_channels(info: &str) -> Vec<(String, String)> {
    info.lines()
        .skip_while(|line| !line.starts_with("channels:"))
        .skip(1)
        .take_while(|line| line.starts_with(' '))
        .filter_map(|line| {
            let (channel, rest) = line.trim().split_once(':')?;
            let version = rest.split_whitespace().next()?;
            (version != "--" && version != "^")
                .then(|| (channel.trim().to_string(), version.to_string()))
        })
        .collect()
}

impl Installer for SnapInstaller {
    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Snap
    }

    fn is_available(&self) -> bool {
        self.ctx.executable_available()
    }

    fn is_installed(&self, cancel: &CancelToken, package: &str) -> Result<bool> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe(cancel, &["list", package])?;
        Ok(out.success && out.stdout.lines().count() > 1)
    }

    fn install_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        let installed = self.is_installed(cancel, package)?;
        self.ctx.ensure_absent(installed, package)?;

        let classic = self
            .ctx
            .execute(cancel, &argv(&["install", "--classic", package]))?;
        if classic.success {
            return Ok(());
        }
        ui::debug(&format!(
            "snap install --classic {} failed, retrying without --classic",
            package
        ));

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
            .execute_checked(cancel, &argv(&["remove", package]), package, "uninstall", &[])
            .map(|_| ())
    }

    fn update_package_manager(&self, cancel: &CancelToken) -> Result<()> {
        self.ctx
            .execute_checked(cancel, &argv(&["refresh"]), "snaps", "refresh", &[])
            .map(|_| ())
    }

    fn get_installed_version(
        &self,
        cancel: &CancelToken,
        package: &str,
    ) -> Result<PackageVersionInfo> {
        sanitize::validate_package_name(package)?;
        let out = self.ctx.probe(cancel, &["list", package])?;
        if !out.success {
            return Ok(PackageVersionInfo::absent(package));
        }
        Ok(out
            .stdout
            .lines()
            .skip(1)
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                (fields.next() == Some(package)).then(|| fields.next()).flatten()
            })
            .next()
            .map(|version| PackageVersionInfo::installed(package, version))
            .unwrap_or_else(|| PackageVersionInfo::absent(package)))
    }

    fn available_versions(&self, cancel: &CancelToken, package: &str) -> Result<Vec<String>> {
        let mut versions: Vec<String> = Vec::new();
        for (_, version) in self.channels(cancel, package)? {
            if !versions.contains(&version) {
                versions.push(version);
            }
        }
        Ok(versions)
    }

    fn install_pinned(&self, cancel: &CancelToken, package: &str, version: &str) -> Result<()> {
        let channel = self
            .channels(cancel, package)?
            .into_iter()
            .find(|(_, v)| v == version)
            .map(|(channel, _)| channel)
            .ok_or_else(|| {
                self.unsupported(&format!(
                    "installing {} {} (no channel publishes it)",
                    package, version
                ))
            })?;

        let channel_arg = format!("--channel={}", channel);
        let classic = self
            .ctx
            .execute(cancel, &argv(&["install", "--classic", &channel_arg, package]))?;
        if classic.success {
            return Ok(());
        }
        self.ctx
            .execute_checked(
                cancel,
                &argv(&["install", &channel_arg, package]),
                package,
                "install",
                NOT_FOUND,
            )
            .map(|_| ())
    }
}
