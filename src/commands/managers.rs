use crate::commands::Runtime;
use crate::core::types::PackageManagerType;
use crate::error::Result;
use crate::packages::{InstallerRegistry, preference_order};
use crate::ui as output;
use crate::utils::platform::HostOs;
use colored::Colorize;

pub fn run(runtime: &Runtime) -> Result<()> {
    let registry = InstallerRegistry::default();
    let os = HostOs::current();

    output::header("Package managers");
    for kind in PackageManagerType::ALL {
        let available = registry.create(kind, runtime.runner())?.is_available();
        let mark = if available {
            "✓".green()
        } else {
            "✗".bright_black()
        };
        output::indent(
            &format!("{} {:<12} {}", mark, kind.display_name(), kind.executable().dimmed()),
            1,
        );
    }

    output::separator();
    let order: Vec<&str> = runtime
        .settings
        .prefer
        .into_iter()
        .chain(
            preference_order(&os)
                .iter()
                .copied()
                .filter(|k| Some(*k) != runtime.settings.prefer),
        )
        .map(|k| k.as_str())
        .collect();
    output::keyval(&format!("Order on {}", os), &order.join(", "));
    Ok(())
}
