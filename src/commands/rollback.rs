use crate::commands::Runtime;
use crate::error::{Result, StackmatchError};
use crate::state::InstallationStatus;
use crate::ui as output;

#[derive(Debug)]
pub struct RollbackOptions {
    pub id: String,
    /// Defaults to the manager the packages were installed with
    pub manager: Option<String>,
    pub yes: bool,
}

pub fn run(runtime: &Runtime, options: RollbackOptions) -> Result<()> {
    let tracker = runtime.tracker()?;
    let record = tracker
        .get_installation(&options.id)?
        .ok_or_else(|| StackmatchError::RecordNotFound(options.id.clone()))?;

    if record.status == InstallationStatus::RolledBack {
        output::info(&format!("Installation {} is already rolled back", record.id));
        return Ok(());
    }

    let packages = record.packages_in_order();
    output::header(&format!("Rolling back {}", record.id));
    for package in packages.iter().rev() {
        output::indent(&format!("{} {}", package.name, package.version), 1);
    }

    if !packages.is_empty()
        && !options.yes
        && !output::prompt_yes_no(&format!("Uninstall {} package(s)?", packages.len()))
    {
        output::info("Rollback cancelled");
        return Ok(());
    }

    let recorded = packages.first().map(|p| p.manager_type.as_str());
    let installer = runtime.installer(options.manager.as_deref().or(recorded))?;

    tracker.rollback(&record.id, installer.as_ref(), &runtime.cancel)?;
    output::success(&format!("Installation {} rolled back", record.id));
    Ok(())
}
