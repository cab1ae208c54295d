use crate::commands::Runtime;
use crate::error::Result;
use crate::ui as output;

pub fn run(runtime: &Runtime, manager: Option<String>) -> Result<()> {
    let installer = runtime.installer(manager.as_deref())?;
    let name = installer.manager_type().display_name();

    output::header(&format!("Updating {}", name));
    installer.update_package_manager(&runtime.cancel)?;
    output::success(&format!("{} is up to date", name));
    Ok(())
}
