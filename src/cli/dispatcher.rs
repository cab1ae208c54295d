//! Command dispatcher
//!
//! Resolves settings once, then routes each command to its handler.

use crate::cli::args::{Cli, Command};
use crate::commands::{self, Runtime};
use crate::config::{Overrides, Settings};
use crate::error::Result;
use crate::packages::runner::CancelToken;

/// Dispatch the parsed CLI command to the appropriate handler
pub fn dispatch(args: &Cli, cancel: CancelToken) -> Result<()> {
    if let Command::Completions { shell } = &args.command {
        return commands::completions::run(*shell);
    }

    let settings = Settings::load(&Overrides {
        config: args.global.config.clone(),
        journal: args.global.journal.clone(),
        timeout: args.global.timeout,
    })?;
    let runtime = Runtime::new(settings, cancel);

    match &args.command {
        Command::Scan { output } => commands::scan::run(
            &runtime,
            commands::scan::ScanOptions {
                output: output.clone(),
            },
        ),

        Command::Export { file } => commands::scan::export(&runtime, file.clone()),

        Command::Apply {
            file,
            pin,
            manager,
            dry_run,
            no_verify,
        } => commands::apply::run(
            &runtime,
            commands::apply::ApplyOptions {
                file: file.clone(),
                pin: *pin,
                manager: manager.clone(),
                dry_run: *dry_run,
                verify: !*no_verify,
            },
        ),

        Command::Install {
            packages,
            manager,
            dry_run,
            no_verify,
        } => commands::install::run(
            &runtime,
            commands::install::InstallOptions {
                packages: packages.clone(),
                manager: manager.clone(),
                dry_run: *dry_run,
                verify: !*no_verify,
            },
        ),

        Command::Rollback { id, manager } => commands::rollback::run(
            &runtime,
            commands::rollback::RollbackOptions {
                id: id.clone(),
                manager: manager.clone(),
                yes: args.global.yes,
            },
        ),

        Command::History { id } => commands::history::run(&runtime, id.clone()),

        Command::Managers => commands::managers::run(&runtime),

        Command::Update { manager } => commands::update::run(&runtime, manager.clone()),

        Command::Completions { shell } => commands::completions::run(*shell),
    }
}
