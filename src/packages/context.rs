//! Shared plumbing for drivers: argv building, running through the
//! configured [`CommandRunner`], and turning failures into typed errors.

use crate::core::types::PackageManagerType;
use crate::error::{Result, StackmatchError};
use crate::packages::runner::{CancelToken, CommandMode, CommandOutput, CommandRunner, render_command};
use crate::utils::sanitize;
use std::sync::Arc;

#[derive(Clone)]
pub struct ManagerContext {
    kind: PackageManagerType,
    runner: Arc<dyn CommandRunner>,
}

impl ManagerContext {
    pub fn new(kind: PackageManagerType, runner: Arc<dyn CommandRunner>) -> Self {
        Self { kind, runner }
    }

    pub fn kind(&self) -> PackageManagerType {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.display_name()
    }

    pub fn executable_available(&self) -> bool {
        self.runner.lookup(self.kind.executable())
    }

    /// Run the manager's own executable, returning output whatever the exit status.
    pub fn probe(&self, cancel: &CancelToken, args: &[&str]) -> Result<CommandOutput> {
        self.probe_with(self.kind.executable(), cancel, args)
    }

    /// Run a helper tool (e.g. `dpkg-query`) for a read-only probe.
    pub fn probe_with(
        &self,
        program: &str,
        cancel: &CancelToken,
        args: &[&str],
    ) -> Result<CommandOutput> {
        self.runner
            .run(program, &argv(args), CommandMode::Query, cancel)
    }

    /// Run a mutating command and return its output whatever the exit status.
    pub fn execute(&self, cancel: &CancelToken, args: &[String]) -> Result<CommandOutput> {
        self.runner
            .run(self.kind.executable(), args, CommandMode::Mutating, cancel)
    }

    /// Run a mutating command; a non-zero exit becomes `CommandFailed`
    /// (or `NotFound` when the output contains one of `not_found_markers`).
    pub fn execute_checked(
        &self,
        cancel: &CancelToken,
        args: &[String],
        package: &str,
        phase: &str,
        not_found_markers: &[&str],
    ) -> Result<String> {
        let output = self
            .execute(cancel, args)
            .map_err(|e| e.in_operation(self.name(), package, phase))?;
        self.check(output, args, package, phase, not_found_markers)
    }

    pub fn check(
        &self,
        output: CommandOutput,
        args: &[String],
        package: &str,
        phase: &str,
        not_found_markers: &[&str],
    ) -> Result<String> {
        let combined = output.combined();
        if output.success {
            return Ok(combined);
        }

        if contains_any(&combined, not_found_markers) {
            return Err(StackmatchError::NotFound {
                package: package.to_string(),
            });
        }

        Err(StackmatchError::CommandFailed {
            command: render_command(self.kind.executable(), args),
            output: combined.trim().to_string(),
        }
        .in_operation(self.name(), package, phase))
    }

    /// Validate a package name and fail with `AlreadyInstalled` when present.
    pub fn ensure_absent(&self, installed: bool, package: &str) -> Result<()> {
        sanitize::validate_package_name(package)?;
        if installed {
            return Err(StackmatchError::AlreadyInstalled {
                package: package.to_string(),
            });
        }
        Ok(())
    }
}

pub fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// `base` followed by each package name.
pub fn argv_with(base: &[&str], packages: &[String]) -> Vec<String> {
    let mut args = argv(base);
    args.extend(packages.iter().cloned());
    args
}

pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Trimmed, non-empty lines after skipping the first `skip`.
pub fn non_empty_lines(text: &str, skip: usize) -> impl Iterator<Item = &str> {
    text.lines()
        .skip(skip)
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

/// Drop a leading `N:` epoch and a trailing `-release` suffix, as used by
/// dpkg, rpm and pacman (`1:2.34.1-1ubuntu1` becomes `2.34.1`).
pub fn strip_epoch_and_release(native: &str) -> String {
    let trimmed = native.trim();
    let without_epoch = match trimmed.split_once(':') {
        Some((epoch, rest)) if !epoch.is_empty() && epoch.chars().all(|c| c.is_ascii_digit()) => {
            rest
        }
        _ => trimmed,
    };
    match without_epoch.rsplit_once('-') {
        Some((upstream, _)) if !upstream.is_empty() => upstream.to_string(),
        _ => without_epoch.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_distro_decorations() {
        assert_eq!(strip_epoch_and_release("1:2.34.1-1ubuntu1"), "2.34.1");
        assert_eq!(strip_epoch_and_release("3.12.1-2.fc39"), "3.12.1");
        assert_eq!(strip_epoch_and_release("14.1"), "14.1");
        assert_eq!(strip_epoch_and_release("1.2.3-rc1-1"), "1.2.3-rc1");
    }

    #[test]
    fn argv_appends_packages() {
        let args = argv_with(&["install", "-y"], &["a".to_string(), "b".to_string()]);
        assert_eq!(args, vec!["install", "-y", "a", "b"]);
    }
}
