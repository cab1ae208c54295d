//! Install Command
//!
//! Installs logical packages under a new journal record so the run can be
//! rolled back later.

use crate::commands::Runtime;
use crate::core::types::PackageRequest;
use crate::environment::EnvironmentData;
use crate::error::Result;
use crate::packages::Orchestrator;
use crate::packages::orchestrator::BatchReport;
use crate::project_identity;
use crate::state::TrackedPackage;
use crate::ui as output;
use colored::Colorize;

#[derive(Debug)]
pub struct InstallOptions {
    /// `name` or `name@constraint`
    pub packages: Vec<String>,
    pub manager: Option<String>,
    pub dry_run: bool,
    pub verify: bool,
}

pub fn run(runtime: &Runtime, options: InstallOptions) -> Result<()> {
    let requests = options
        .packages
        .iter()
        .map(|p| p.parse::<PackageRequest>())
        .collect::<Result<Vec<_>>>()?;

    install_requests(
        runtime,
        &requests,
        None,
        options.manager.as_deref(),
        options.dry_run,
        options.verify,
    )
}

/// Shared by `install` and `apply`: one journal record per call, one
/// tracked package per fresh install.
pub(crate) fn install_requests(
    runtime: &Runtime,
    requests: &[PackageRequest],
    environment: Option<EnvironmentData>,
    manager: Option<&str>,
    dry_run: bool,
    verify: bool,
) -> Result<()> {
    let installer = runtime.installer(manager)?;
    let kind = installer.manager_type();
    let orchestrator = Orchestrator::new(installer, runtime.settings.package_mappings()?)
        .with_progress(!output::is_quiet())
        .with_verification(verify);

    if dry_run {
        output::header(&format!("Would install via {}", kind.display_name()));
        for request in requests {
            let native = orchestrator.resolve_name(&request.name)?;
            let constraint = request
                .constraint
                .as_deref()
                .map(|c| format!(" ({})", c))
                .unwrap_or_default();
            output::indent(&format!("{} -> {}{}", request.name, native.cyan(), constraint), 1);
        }
        return Ok(());
    }

    let tracker = runtime.tracker()?;
    let record = tracker.start_installation(environment)?;
    output::header(&format!(
        "Installing {} package(s) via {}",
        requests.len(),
        kind.display_name()
    ));
    output::keyval("Installation", &record.id);

    let mut tracking_error = None;
    let report = orchestrator.install_packages_observed(&runtime.cancel, requests, |package| {
        if tracking_error.is_some() {
            return;
        }
        let tracked = TrackedPackage::new(&package.name, &package.version, kind);
        if let Err(e) = tracker.add_package(&record.id, tracked) {
            tracking_error = Some(e);
        }
    });

    print_report(&report);

    if let Some(e) = tracking_error {
        tracker.fail_installation(&record.id, &e.to_string())?;
        return Err(e);
    }

    match report.into_result() {
        Ok(_) => {
            tracker.complete_installation(&record.id)?;
            output::success(&format!("Installation {} completed", record.id));
            Ok(())
        }
        Err(e) => {
            tracker.fail_installation(&record.id, &e.to_string())?;
            output::info(&format!(
                "Undo the packages installed so far with: {}",
                project_identity::cli_with(&format!("rollback {}", record.id))
            ));
            Err(e)
        }
    }
}

fn print_report(report: &BatchReport) {
    for package in &report.installed {
        output::success(&format!("{} {}", package.name, package.version.green()));
    }
    for package in &report.already_present {
        output::indent(
            &format!(
                "{} {} {}",
                package.name,
                package.version,
                "(already installed)".dimmed()
            ),
            1,
        );
    }
    for (name, reason) in &report.failed {
        output::error(&format!("{}: {}", name, reason));
    }
}
