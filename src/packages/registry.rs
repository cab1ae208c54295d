//! # Installer Registry
//!
//! Maps each [`PackageManagerType`] to a factory building its driver, and
//! picks the driver to use on this host.
//!
//! ## Adding a New Manager
//!
//! 1. Create `src/packages/<manager>.rs` implementing [`Installer`]
//! 2. Add the variant to `core::types::PackageManagerType`
//! 3. Register it in `InstallerRegistry::register_defaults()`
//! 4. Place it in `preference_order()` for the OSes where it lives

use crate::core::types::PackageManagerType;
use crate::error::{Result, StackmatchError};
use crate::packages::Installer;
use crate::packages::runner::CommandRunner;
use crate::ui;
use crate::utils::platform::HostOs;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory function for creating driver instances
pub type InstallerFactory = Box<dyn Fn(Arc<dyn CommandRunner>) -> Box<dyn Installer> + Send + Sync>;

pub struct InstallerRegistry {
    factories: HashMap<PackageManagerType, InstallerFactory>,
}

impl Default for InstallerRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }
}

impl InstallerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, kind: PackageManagerType, factory: F)
    where
        F: Fn(Arc<dyn CommandRunner>) -> Box<dyn Installer> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    pub fn create(
        &self,
        kind: PackageManagerType,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Box<dyn Installer>> {
        let factory = self.factories.get(&kind).ok_or_else(|| {
            StackmatchError::Other(format!("No driver registered for {}", kind.display_name()))
        })?;
        Ok(factory(runner))
    }

    pub fn has_manager(&self, kind: PackageManagerType) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Register the nine built-in drivers.
    pub fn register_defaults(&mut self) {
        use crate::packages::*;

        self.register(PackageManagerType::Apt, |runner| {
            Box::new(apt::AptInstaller::new(runner))
        });
        self.register(PackageManagerType::Dnf, |runner| {
            Box::new(rpm::RpmInstaller::dnf(runner))
        });
        self.register(PackageManagerType::Yum, |runner| {
            Box::new(rpm::RpmInstaller::yum(runner))
        });
        self.register(PackageManagerType::Pacman, |runner| {
            Box::new(pacman::PacmanInstaller::new(runner))
        });
        self.register(PackageManagerType::Snap, |runner| {
            Box::new(snap::SnapInstaller::new(runner))
        });
        self.register(PackageManagerType::Homebrew, |runner| {
            Box::new(brew::BrewInstaller::new(runner))
        });
        self.register(PackageManagerType::Chocolatey, |runner| {
            Box::new(chocolatey::ChocolateyInstaller::new(runner))
        });
        self.register(PackageManagerType::Scoop, |runner| {
            Box::new(scoop::ScoopInstaller::new(runner))
        });
        self.register(PackageManagerType::Winget, |runner| {
            Box::new(winget::WingetInstaller::new(runner))
        });
    }

    /// First available driver for `os`. A `preferred` manager, when given
    /// and available, wins over the OS list.
    pub fn detect(
        &self,
        os: &HostOs,
        preferred: Option<PackageManagerType>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Box<dyn Installer>> {
        let order = preferred
            .into_iter()
            .chain(preference_order(os).iter().copied().filter(|k| Some(*k) != preferred));

        for kind in order {
            let Some(factory) = self.factories.get(&kind) else {
                continue;
            };
            let installer = factory(runner.clone());
            if installer.is_available() {
                ui::debug(&format!("Using {}", kind.display_name()));
                return Ok(installer);
            }
            if preferred == Some(kind) {
                ui::warning(&format!(
                    "Preferred package manager {} is not available, falling back",
                    kind.display_name()
                ));
            }
        }

        Err(StackmatchError::NoSupportedManagerFound { os: os.to_string() })
    }
}

/// Managers tried on each OS, most preferred first. Chocolatey leads on
/// Windows because its repository is the largest.
pub fn preference_order(os: &HostOs) -> &'static [PackageManagerType] {
    use PackageManagerType::*;
    match os {
        HostOs::Windows => &[Chocolatey, Scoop, Winget],
        HostOs::MacOs => &[Homebrew],
        HostOs::Linux | HostOs::Other(_) => &[Apt, Dnf, Yum, Pacman, Snap],
    }
}

/// Best driver for the running host.
pub fn detect_package_manager(runner: Arc<dyn CommandRunner>) -> Result<Box<dyn Installer>> {
    detect_package_manager_with(&HostOs::current(), None, runner)
}

pub fn detect_package_manager_with(
    os: &HostOs,
    preferred: Option<PackageManagerType>,
    runner: Arc<dyn CommandRunner>,
) -> Result<Box<dyn Installer>> {
    InstallerRegistry::default().detect(os, preferred, runner)
}

/// Driver for an explicitly chosen manager, failing when it is not installed.
pub fn create_installer(
    kind: PackageManagerType,
    runner: Arc<dyn CommandRunner>,
) -> Result<Box<dyn Installer>> {
    let installer = InstallerRegistry::default().create(kind, runner)?;
    if !installer.is_available() {
        return Err(StackmatchError::Other(format!(
            "{} is not available on this system ('{}' not found in PATH)",
            kind.display_name(),
            kind.executable()
        )));
    }
    Ok(installer)
}
