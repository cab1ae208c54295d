use crate::commands::Runtime;
use crate::error::{Result, StackmatchError};
use crate::packages::PackageMappings;
use crate::state::{InstallationRecord, InstallationStatus, RollbackOutcome};
use crate::ui as output;
use colored::{ColoredString, Colorize};

pub fn run(runtime: &Runtime, id: Option<String>) -> Result<()> {
    let tracker = runtime.tracker()?;
    match id {
        Some(id) => {
            let record = tracker
                .get_installation(&id)?
                .ok_or(StackmatchError::RecordNotFound(id))?;
            show(&record, &runtime.settings.package_mappings()?);
        }
        None => {
            let records = tracker.list_installations()?;
            if records.is_empty() {
                output::info("No installations recorded yet");
                return Ok(());
            }
            output::header("Installations");
            for record in &records {
                println!(
                    "{}  {:<16} {}  {} package(s)",
                    record.id,
                    status_label(record.status),
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.packages.len()
                );
            }
        }
    }
    Ok(())
}

fn show(record: &InstallationRecord, mappings: &PackageMappings) {
    output::header(&record.id);
    output::keyval("Status", &status_label(record.status).to_string());
    output::keyval(
        "Updated",
        &record.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    if let Some(env) = &record.environment {
        output::keyval(
            "Snapshot",
            &format!("{} {} ({})", env.system.os, env.system.arch, env.system.hostname),
        );
    }
    for (key, value) in &record.metadata {
        output::keyval(key, value);
    }

    output::separator();
    for package in record.packages_in_order() {
        let rollback = match &package.rollback {
            Some(RollbackOutcome::Uninstalled) => " uninstalled".dimmed().to_string(),
            Some(RollbackOutcome::Failed { reason }) => format!(" {}", reason.red()),
            None => String::new(),
        };
        let logical = mappings
            .logical_name(&package.name, package.manager_type)
            .filter(|logical| *logical != package.name)
            .map(|logical| format!(" ({})", logical))
            .unwrap_or_default();
        output::indent(
            &format!(
                "{}{} {} [{}]{}",
                package.name, logical, package.version, package.manager_type, rollback
            ),
            1,
        );
    }
}

fn status_label(status: InstallationStatus) -> ColoredString {
    match status {
        InstallationStatus::Completed | InstallationStatus::RolledBack => status.as_str().green(),
        InstallationStatus::InProgress | InstallationStatus::RollingBack => {
            status.as_str().yellow()
        }
        InstallationStatus::Failed | InstallationStatus::RollbackFailed => status.as_str().red(),
    }
}
