//! Scan and Export Commands
//!
//! Probe the host for known tools and print or save the snapshot.

use crate::commands::Runtime;
use crate::environment::{self, EnvironmentData, Scanner};
use crate::error::Result;
use crate::project_identity;
use crate::ui as output;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug)]
pub struct ScanOptions {
    /// Also write the snapshot here
    pub output: Option<PathBuf>,
}

pub fn run(runtime: &Runtime, options: ScanOptions) -> Result<()> {
    let data = scan(runtime)?;
    print_snapshot(&data);

    if let Some(path) = options.output {
        environment::export_json(&data, &path)?;
        output::success(&format!("Snapshot written to {}", path.display()));
    }
    Ok(())
}

/// `export FILE`: scan and write, printing only a summary.
pub fn export(runtime: &Runtime, file: PathBuf) -> Result<()> {
    let data = scan(runtime)?;
    environment::export_json(&data, &file)?;
    output::success(&format!(
        "Exported {} entries to {}",
        data.entries().count(),
        file.display()
    ));
    Ok(())
}

fn scan(runtime: &Runtime) -> Result<EnvironmentData> {
    output::header(&format!("{} environment scan", project_identity::DISPLAY_NAME));
    let data = Scanner::new(runtime.runner(), runtime.cancel.clone()).scan();
    runtime.cancel.check("scan")?;
    Ok(data)
}

pub fn print_snapshot(data: &EnvironmentData) {
    output::keyval("OS", &data.system.os);
    output::keyval("Arch", &data.system.arch);
    if !data.system.shell.is_empty() {
        output::keyval("Shell", &data.system.shell);
    }
    if !data.system.hostname.is_empty() {
        output::keyval("Hostname", &data.system.hostname);
    }

    print_section("Languages", &data.configured_languages);
    print_section("Tools", &data.tools);
    print_section("Editors", &data.code_editors);
    print_section("Package managers", &data.package_managers);

    if !data.config_files.is_empty() {
        output::separator();
        output::keyval("Config files", &data.config_files.len().to_string());
        for file in &data.config_files {
            output::indent(&file.dimmed().to_string(), 1);
        }
    }
}

fn print_section(title: &str, entries: &BTreeMap<String, String>) {
    if entries.is_empty() {
        return;
    }
    output::separator();
    output::info(title);
    for (name, version) in entries {
        output::indent(&format!("{:<18} {}", name, version.green()), 1);
    }
}
