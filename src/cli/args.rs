use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "stackmatch",
    about = "Replay a development environment through the native package manager",
    long_about = "Scan the tools installed on one machine, then install the same stack on \
                  another through apt, dnf, yum, pacman, snap, Homebrew, Chocolatey, Scoop \
                  or winget. Every install run is journaled and can be rolled back.",
    version,
    next_line_help = false,
    term_width = 80
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Parser, Debug)]
pub struct GlobalFlags {
    /// Verbose output (shows every package-manager command)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Quiet mode
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    /// Settings file (default: per-user config dir, or $STACKMATCH_CONFIG)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Installation journal (default: per-user state dir, or $STACKMATCH_JOURNAL)
    #[arg(long, value_name = "PATH", global = true)]
    pub journal: Option<PathBuf>,

    /// Per-command timeout in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan installed tools and print the snapshot
    Scan {
        /// Also write the snapshot as JSON
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Scan and write the snapshot to a file
    Export {
        /// Destination JSON file
        file: PathBuf,
    },

    /// Install everything a snapshot lists
    Apply {
        /// Snapshot JSON produced by `export`
        file: PathBuf,

        /// Require the exact versions recorded in the snapshot
        #[arg(long)]
        pin: bool,

        /// Package manager to use instead of detection
        #[arg(short, long, value_name = "MANAGER")]
        manager: Option<String>,

        /// Show what would be installed without installing
        #[arg(long)]
        dry_run: bool,

        /// Skip the post-install version check
        #[arg(long)]
        no_verify: bool,
    },

    /// Install packages by logical name (name or name@constraint)
    Install {
        #[arg(required = true, value_name = "PACKAGE")]
        packages: Vec<String>,

        /// Package manager to use instead of detection
        #[arg(short, long, value_name = "MANAGER")]
        manager: Option<String>,

        /// Show what would be installed without installing
        #[arg(long)]
        dry_run: bool,

        /// Skip the post-install version check
        #[arg(long)]
        no_verify: bool,
    },

    /// Uninstall the packages of a journaled installation
    Rollback {
        /// Installation id (see `history`)
        id: String,

        /// Package manager to use (default: the one recorded)
        #[arg(short, long, value_name = "MANAGER")]
        manager: Option<String>,
    },

    /// List journaled installations, or show one
    History {
        /// Installation id
        id: Option<String>,
    },

    /// Show supported package managers and which are available
    Managers,

    /// Refresh the package manager's metadata and upgrade
    Update {
        /// Package manager to use instead of detection
        #[arg(short, long, value_name = "MANAGER")]
        manager: Option<String>,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stackmatch",
            "install",
            "git",
            "nodejs@>=18",
            "--journal",
            "/tmp/j.json",
            "-v",
        ])
        .unwrap();
        assert!(cli.global.verbose);
        assert_eq!(cli.global.journal, Some(PathBuf::from("/tmp/j.json")));
        match cli.command {
            Command::Install { packages, .. } => assert_eq!(packages, vec!["git", "nodejs@>=18"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn install_requires_a_package() {
        assert!(Cli::try_parse_from(["stackmatch", "install"]).is_err());
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["stackmatch", "-q", "-v", "managers"]).is_err());
    }
}
