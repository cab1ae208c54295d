//! Command handlers. Each one receives a [`Runtime`] carrying the resolved
//! settings and the process-wide cancellation token.

pub mod apply;
pub mod completions;
pub mod history;
pub mod install;
pub mod managers;
pub mod rollback;
pub mod scan;
pub mod update;

use crate::config::Settings;
use crate::core::types::PackageManagerType;
use crate::error::Result;
use crate::packages::runner::{CancelToken, CommandRunner};
use crate::packages::{Installer, create_installer, detect_package_manager_with};
use crate::state::InstallationTracker;
use crate::utils::platform::HostOs;
use std::sync::Arc;

pub struct Runtime {
    pub settings: Settings,
    pub cancel: CancelToken,
    runner: Arc<dyn CommandRunner>,
}

impl Runtime {
    pub fn new(settings: Settings, cancel: CancelToken) -> Self {
        let runner = Arc::new(settings.runner());
        Self::with_runner(settings, cancel, runner)
    }

    pub fn with_runner(
        settings: Settings,
        cancel: CancelToken,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            settings,
            cancel,
            runner,
        }
    }

    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        self.runner.clone()
    }

    /// Driver named on the command line, or the detected one.
    pub fn installer(&self, manager: Option<&str>) -> Result<Box<dyn Installer>> {
        match manager {
            Some(name) => {
                let kind: PackageManagerType = name.parse()?;
                create_installer(kind, self.runner())
            }
            None => detect_package_manager_with(
                &HostOs::current(),
                self.settings.prefer,
                self.runner(),
            ),
        }
    }

    pub fn tracker(&self) -> Result<InstallationTracker> {
        InstallationTracker::open(self.settings.journal_path()?)
    }
}
