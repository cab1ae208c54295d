//! Installs logical packages through one driver: maps names, retries with
//! the unmapped name when the mapped one is unknown, and runs batches with
//! partial-failure semantics.

use crate::core::types::{PackageRequest, PackageVersionInfo};
use crate::error::{Result, StackmatchError};
use crate::packages::mappings::PackageMappings;
use crate::packages::runner::CancelToken;
use crate::packages::traits::Installer;
use crate::ui;
use crate::ui::progress::ProgressBar;
use crate::version;

/// How a single package request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Installed,
    AlreadyPresent,
}

/// A package the driver reports as present after a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    /// Name as requested.
    pub logical: String,
    /// Name the package manager knows it by.
    pub name: String,
    /// Installed version; empty when the driver cannot tell.
    pub version: String,
    pub constraint: Option<String>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub installed: Vec<InstalledPackage>,
    pub already_present: Vec<InstalledPackage>,
    /// (logical name, reason)
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// The aggregate error when anything failed.
    pub fn into_result(self) -> Result<Self> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(StackmatchError::BatchFailed {
                failures: self.failed,
            })
        }
    }

    fn record(&mut self, outcome: Outcome, package: InstalledPackage) {
        match outcome {
            Outcome::Installed => self.installed.push(package),
            Outcome::AlreadyPresent => self.already_present.push(package),
        }
    }
}

pub struct Orchestrator {
    installer: Box<dyn Installer>,
    mappings: PackageMappings,
    progress: bool,
    verify: bool,
}

impl Orchestrator {
    pub fn new(installer: Box<dyn Installer>, mappings: PackageMappings) -> Self {
        Self {
            installer,
            mappings,
            progress: false,
            verify: true,
        }
    }

    /// Draw a progress bar during batch installs.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Check every freshly installed package afterwards (default on).
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn installer(&self) -> &dyn Installer {
        self.installer.as_ref()
    }

    pub fn mappings(&self) -> &PackageMappings {
        &self.mappings
    }

    /// Name `logical` goes by under the active manager.
    pub fn resolve_name(&self, logical: &str) -> Result<String> {
        self.mappings
            .package_name(logical, self.installer.manager_type())
    }

    /// Install one logical package, optionally constrained. Already present
    /// (or already satisfying) packages are reported, not treated as errors.
    pub fn install_package(
        &self,
        cancel: &CancelToken,
        logical: &str,
        constraint: Option<&str>,
    ) -> Result<(Outcome, InstalledPackage)> {
        let constraint = effective_constraint(constraint);
        let (name, outcome) = self.install_resolved(cancel, logical, constraint)?;
        let (package, verified) = self.settle(cancel, logical, name, constraint, outcome);
        verified.map(|()| (outcome, package))
    }

    /// Run the install under the mapped name, retrying under the logical name
    /// when the mapped one is unknown. Returns the name that was installed.
    fn install_resolved(
        &self,
        cancel: &CancelToken,
        logical: &str,
        constraint: Option<&str>,
    ) -> Result<(String, Outcome)> {
        let mapped = self.resolve_name(logical)?;
        match self.install_native(cancel, &mapped, constraint) {
            Err(e) if e.is_not_found() && mapped != logical => {
                ui::debug(&format!(
                    "'{}' not found under {}, retrying as '{}'",
                    mapped,
                    self.installer.manager_type().display_name(),
                    logical
                ));
                let outcome = self.install_native(cancel, logical, constraint)?;
                Ok((logical.to_string(), outcome))
            }
            other => Ok((mapped, other?)),
        }
    }

    fn install_native(
        &self,
        cancel: &CancelToken,
        name: &str,
        constraint: Option<&str>,
    ) -> Result<Outcome> {
        let Some(constraint) = constraint else {
            return match self.installer.install_package(cancel, name) {
                Ok(()) => Ok(Outcome::Installed),
                Err(e) if e.is_already_installed() => Ok(Outcome::AlreadyPresent),
                Err(e) => Err(e),
            };
        };

        let current = self.installer.check_version(cancel, name, constraint)?;
        if current.is_installed() && current.satisfies_constraint {
            return Ok(Outcome::AlreadyPresent);
        }
        self.installer.install_version(cancel, name, constraint)?;
        Ok(Outcome::Installed)
    }

    /// The package as the driver reports it after a request, and whether a
    /// fresh install passed verification. A package that failed verification
    /// is still returned, with an empty version.
    fn settle(
        &self,
        cancel: &CancelToken,
        logical: &str,
        name: String,
        constraint: Option<&str>,
        outcome: Outcome,
    ) -> (InstalledPackage, Result<()>) {
        let info = if outcome == Outcome::Installed && self.verify {
            verify_installation(self.installer.as_ref(), cancel, &name, constraint)
        } else {
            match self.installer.get_installed_version(cancel, &name) {
                Err(e) if !e.is_cancelled() => {
                    ui::debug(&format!("Could not read version of {}: {}", name, e));
                    Ok(PackageVersionInfo::absent(&name))
                }
                other => other,
            }
        };

        let (version, verified) = match info {
            Ok(info) => (info.installed_version, Ok(())),
            Err(e) => (String::new(), Err(e)),
        };
        let package = InstalledPackage {
            logical: logical.to_string(),
            name,
            version,
            constraint: constraint.map(str::to_string),
        };
        (package, verified)
    }

    /// Install a batch without stopping at the first failure.
    pub fn install_packages_report(
        &self,
        cancel: &CancelToken,
        requests: &[PackageRequest],
    ) -> BatchReport {
        self.install_packages_observed(cancel, requests, |_| {})
    }

    /// Like [`install_packages_report`](Self::install_packages_report), the
    /// aggregate error naming every failed package.
    pub fn install_packages(
        &self,
        cancel: &CancelToken,
        requests: &[PackageRequest],
    ) -> Result<BatchReport> {
        self.install_packages_report(cancel, requests).into_result()
    }

    /// Batch install calling `observe` as soon as the manager has installed
    /// a package, before verification, so a package that then fails
    /// verification is still seen. Unconstrained requests go first, as one native batch when
    /// the manager supports it. If that batch cannot run or fails, those
    /// requests fall back to one at a time, followed by every constrained
    /// request, each in request order.
    pub fn install_packages_observed<F>(
        &self,
        cancel: &CancelToken,
        requests: &[PackageRequest],
        mut observe: F,
    ) -> BatchReport
    where
        F: FnMut(&InstalledPackage),
    {
        let mut report = BatchReport::default();
        if requests.is_empty() {
            return report;
        }

        let mut bar = if self.progress {
            ProgressBar::new(requests.len(), "Installing packages")
        } else {
            ProgressBar::hidden(requests.len())
        };

        let (plain, constrained): (Vec<&PackageRequest>, Vec<&PackageRequest>) = requests
            .iter()
            .partition(|r| r.constraint.as_deref().is_none_or(version::is_unconstrained));

        let mut pending = self.install_batch(cancel, &plain, &mut report, &mut bar, &mut observe);
        pending.extend(constrained);

        for request in pending {
            if cancel.is_cancelled() {
                report
                    .failed
                    .push((request.name.clone(), "cancelled before install".to_string()));
                bar.inc();
                continue;
            }
            bar.set_message(&request.name);
            let constraint = effective_constraint(request.constraint.as_deref());
            match self.install_resolved(cancel, &request.name, constraint) {
                Ok((name, outcome)) => {
                    let settled = self.settle(cancel, &request.name, name, constraint, outcome);
                    conclude(&mut report, &mut observe, outcome, settled);
                }
                Err(e) => report.failed.push((request.name.clone(), e.to_string())),
            }
            bar.inc();
        }

        bar.finish();
        report
    }

    /// One native install for the unconstrained requests that are mapped
    /// and not yet present. Returns the requests left for the sequential
    /// path: none after a successful batch, all of them when the batch could
    /// not be attempted or failed.
    fn install_batch<'a, F>(
        &self,
        cancel: &CancelToken,
        plain: &[&'a PackageRequest],
        report: &mut BatchReport,
        bar: &mut ProgressBar,
        observe: &mut F,
    ) -> Vec<&'a PackageRequest>
    where
        F: FnMut(&InstalledPackage),
    {
        if plain.len() < 2 {
            return plain.to_vec();
        }

        let mut missing: Vec<(&PackageRequest, String)> = Vec::new();
        let mut present: Vec<(&PackageRequest, String)> = Vec::new();
        for &request in plain {
            let Ok(name) = self.resolve_name(&request.name) else {
                return plain.to_vec();
            };
            match self.installer.is_installed(cancel, &name) {
                Ok(true) => present.push((request, name)),
                Ok(false) => missing.push((request, name)),
                Err(_) => return plain.to_vec(),
            }
        }

        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(|(_, name)| name.clone()).collect();
            bar.set_message(&names.join(" "));
            if let Err(e) = self.installer.install_multiple(cancel, &names) {
                ui::debug(&format!(
                    "Batch install failed ({}), installing one at a time",
                    e
                ));
                return plain.to_vec();
            }
        }

        let settled = present
            .into_iter()
            .map(|entry| (entry, Outcome::AlreadyPresent))
            .chain(missing.into_iter().map(|entry| (entry, Outcome::Installed)));
        for ((request, name), outcome) in settled {
            let result = self.settle(cancel, &request.name, name, None, outcome);
            conclude(report, observe, outcome, result);
            bar.inc();
        }
        Vec::new()
    }

    pub fn verify(
        &self,
        cancel: &CancelToken,
        package: &str,
        constraint: Option<&str>,
    ) -> Result<PackageVersionInfo> {
        verify_installation(self.installer.as_ref(), cancel, package, constraint)
    }
}

fn effective_constraint(constraint: Option<&str>) -> Option<&str> {
    constraint.filter(|c| !version::is_unconstrained(c))
}

/// File a settled package into the report. Fresh installs are observed even
/// when verification failed.
fn conclude<F>(
    report: &mut BatchReport,
    observe: &mut F,
    outcome: Outcome,
    (package, verified): (InstalledPackage, Result<()>),
) where
    F: FnMut(&InstalledPackage),
{
    if outcome == Outcome::Installed {
        observe(&package);
    }
    match verified {
        Ok(()) => report.record(outcome, package),
        Err(e) => report.failed.push((package.logical, e.to_string())),
    }
}

/// Confirm `package` reports an installed version and, when given, that it
/// satisfies `constraint`.
pub fn verify_installation(
    installer: &dyn Installer,
    cancel: &CancelToken,
    package: &str,
    constraint: Option<&str>,
) -> Result<PackageVersionInfo> {
    let info = installer.get_installed_version(cancel, package)?;
    if !info.is_installed() {
        return Err(StackmatchError::VerificationFailed {
            package: package.to_string(),
            reason: format!(
                "{} does not report it as installed",
                installer.manager_type().display_name()
            ),
        });
    }

    match constraint.filter(|c| !version::is_unconstrained(c)) {
        Some(constraint) => {
            let checked = installer.check_version(cancel, package, constraint)?;
            if !checked.satisfies_constraint {
                return Err(StackmatchError::VerificationFailed {
                    package: package.to_string(),
                    reason: format!(
                        "installed {} does not satisfy '{}'",
                        checked.installed_version, constraint
                    ),
                });
            }
            ui::debug(&format!(
                "Verified {} {} (required: {})",
                package, checked.installed_version, constraint
            ));
            Ok(checked)
        }
        None => {
            ui::debug(&format!("Verified {} {}", package, info.installed_version));
            Ok(info)
        }
    }
}
