//! # Package Manager Drivers
//!
//! One driver per native package manager, all implementing [`Installer`].
//! Drivers never spawn processes themselves: every invocation goes through
//! a [`CommandRunner`], so the same code runs against the host or a
//! scripted runner in tests.
//!
//! ## Layout
//!
//! - `apt`, `rpm` (DNF and YUM), `pacman`, `snap`: Linux
//! - `brew`: macOS
//! - `chocolatey`, `scoop`, `winget`: Windows
//! - `context`: argv building and error mapping shared by the drivers
//! - `mappings`: logical package names per manager
//! - `registry`: driver factories and host detection
//! - `orchestrator`: mapping, retry and batch installs on top of a driver
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stackmatch::packages::{Orchestrator, PackageMappings, SystemRunner, detect_package_manager};
//! use stackmatch::packages::runner::CancelToken;
//! use std::sync::Arc;
//!
//! let runner = Arc::new(SystemRunner::default());
//! let installer = detect_package_manager(runner)?;
//! let orchestrator = Orchestrator::new(installer, PackageMappings::builtin());
//! orchestrator.install_package(&CancelToken::new(), "nodejs", Some(">=18"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod apt;
pub mod brew;
pub mod chocolatey;
pub mod context;
pub mod mappings;
pub mod orchestrator;
pub mod pacman;
pub mod registry;
pub mod rpm;
pub mod runner;
pub mod scoop;
pub mod snap;
pub mod traits;
pub mod winget;

#[cfg(test)]
pub(crate) mod testing;

pub use mappings::{PackageMapping, PackageMappings};
pub use orchestrator::{BatchReport, Orchestrator, verify_installation};
pub use registry::{
    InstallerRegistry, create_installer, detect_package_manager, detect_package_manager_with,
    preference_order,
};
pub use runner::{CancelToken, CommandRunner, SystemRunner};
pub use traits::Installer;
