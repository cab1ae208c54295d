//! Apply Command
//!
//! Replays an exported snapshot on this machine.

use crate::commands::{Runtime, install};
use crate::environment;
use crate::error::Result;
use crate::ui as output;
use std::path::PathBuf;

#[derive(Debug)]
pub struct ApplyOptions {
    pub file: PathBuf,
    /// Require the recorded versions
    pub pin: bool,
    pub manager: Option<String>,
    pub dry_run: bool,
    pub verify: bool,
}

pub fn run(runtime: &Runtime, options: ApplyOptions) -> Result<()> {
    let data = environment::import_json(&options.file)?;
    output::keyval(
        "Snapshot",
        &format!(
            "{} ({}, {})",
            options.file.display(),
            if data.system.hostname.is_empty() {
                data.system.os.as_str()
            } else {
                data.system.hostname.as_str()
            },
            data.scan_date.format("%Y-%m-%d %H:%M")
        ),
    );

    let requests = data.installable_packages(options.pin);
    if requests.is_empty() {
        output::warning("The snapshot lists nothing that can be installed");
        return Ok(());
    }

    install::install_requests(
        runtime,
        &requests,
        Some(data),
        options.manager.as_deref(),
        options.dry_run,
        options.verify,
    )
}
