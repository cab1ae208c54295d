pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod environment;
pub mod error;
pub mod packages;
pub mod project_identity;
pub mod state;
pub mod ui;
pub mod utils;
pub mod version;

use clap::Parser;
use crate::packages::runner::CancelToken;
use std::process::exit;

/// Run the stackmatch CLI entrypoint.
pub fn run_cli() {
    // Colour settings first, everything below may print
    ui::init_colors();

    let args = cli::args::Cli::parse();
    ui::set_quiet(args.global.quiet);
    ui::set_verbose(args.global.verbose);

    // Ctrl-C stops the running package-manager command; the journal keeps
    // whatever was installed so far
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        ui::warning("Operation cancelled by user.");
        handler_token.cancel();
    }) {
        ui::warning(&format!("Could not install Ctrl-C handler: {}", e));
    }

    if let Err(e) = cli::dispatcher::dispatch(&args, cancel) {
        ui::error(&format!("{}", e));
        exit(1);
    }
}
