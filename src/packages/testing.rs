//! Test doubles: a scripted [`CommandRunner`] for driver tests and an
//! in-memory [`Installer`] for everything above the drivers.

use crate::core::types::{PackageManagerType, PackageVersionInfo};
use crate::error::{Result, StackmatchError};
use crate::packages::runner::{CancelToken, CommandMode, CommandOutput, CommandRunner};
use crate::packages::traits::Installer;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

struct Rule {
    prefix: String,
    outputs: VecDeque<CommandOutput>,
}

/// Responses are keyed by command-line prefix (`"apt-get install"`); the
/// longest matching prefix wins. Each rule replays its queued outputs in
/// order and keeps repeating the last one. Unscripted commands exit 1 with
/// no output.
#[derive(Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<Rule>>,
    programs: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, CommandMode)>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(self, program: &str) -> Self {
        self.programs
            .lock()
            .expect("programs lock")
            .insert(program.to_string());
        self
    }

    pub fn on(self, prefix: &str, output: CommandOutput) -> Self {
        {
            let mut rules = self.rules.lock().expect("rules lock");
            match rules.iter_mut().find(|r| r.prefix == prefix) {
                Some(rule) => rule.outputs.push_back(output),
                None => rules.push(Rule {
                    prefix: prefix.to_string(),
                    outputs: VecDeque::from([output]),
                }),
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(line, _)| line.clone())
            .collect()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(_, mode)| *mode == CommandMode::Mutating)
            .map(|(line, _)| line.clone())
            .collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        mode: CommandMode,
        cancel: &CancelToken,
    ) -> Result<CommandOutput> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        cancel.check(&line)?;
        self.calls
            .lock()
            .expect("calls lock")
            .push((line.clone(), mode));

        let mut rules = self.rules.lock().expect("rules lock");
        let rule = rules
            .iter_mut()
            .filter(|r| line.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len());

        Ok(match rule {
            Some(rule) if rule.outputs.len() > 1 => rule.outputs.pop_front().unwrap_or_default(),
            Some(rule) => rule.outputs.front().cloned().unwrap_or_default(),
            None => fail(""),
        })
    }

    fn lookup(&self, program: &str) -> bool {
        self.programs
            .lock()
            .expect("programs lock")
            .contains(program)
    }
}

pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        success: true,
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn fail(stderr: &str) -> CommandOutput {
    CommandOutput {
        success: false,
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// In-memory [`Installer`] with a fixed repository, for orchestrator and
/// tracker tests that care about installed state rather than command lines.
/// Clones share installed state and the call log.
#[derive(Clone)]
pub struct MemoryInstaller {
    kind: PackageManagerType,
    /// name -> versions, newest first
    repo: BTreeMap<String, Vec<String>>,
    installed: Arc<Mutex<BTreeMap<String, String>>>,
    broken_installs: HashSet<String>,
    broken_uninstalls: HashSet<String>,
    unlisted: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MemoryInstaller {
    pub fn new(kind: PackageManagerType) -> Self {
        Self {
            kind,
            repo: BTreeMap::new(),
            installed: Arc::new(Mutex::new(BTreeMap::new())),
            broken_installs: HashSet::new(),
            broken_uninstalls: HashSet::new(),
            unlisted: HashSet::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_package(mut self, name: &str, versions: &[&str]) -> Self {
        self.repo
            .insert(name.to_string(), versions.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn with_installed(self, name: &str, version: &str) -> Self {
        self.installed
            .lock()
            .expect("installed lock")
            .insert(name.to_string(), version.to_string());
        self
    }

    /// Installing `name` exits non-zero.
    pub fn failing_install(mut self, name: &str) -> Self {
        self.broken_installs.insert(name.to_string());
        self
    }

    /// Removing `name` exits non-zero.
    pub fn failing_uninstall(mut self, name: &str) -> Self {
        self.broken_uninstalls.insert(name.to_string());
        self
    }

    /// Installing `name` succeeds but the manager never lists it afterwards.
    pub fn unlisted_after_install(mut self, name: &str) -> Self {
        self.unlisted.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn installed(&self) -> BTreeMap<String, String> {
        self.installed.lock().expect("installed lock").clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn put(&self, name: &str, version: &str) -> Result<()> {
        if self.broken_installs.contains(name) {
            return Err(StackmatchError::CommandFailed {
                command: format!("install {}", name),
                output: "E: Sub-process returned an error code".to_string(),
            });
        }
        if self.unlisted.contains(name) {
            return Ok(());
        }
        self.installed
            .lock()
            .expect("installed lock")
            .insert(name.to_string(), version.to_string());
        Ok(())
    }
}

impl Installer for MemoryInstaller {
    fn manager_type(&self) -> PackageManagerType {
        self.kind
    }

    fn is_available(&self) -> bool {
        true
    }

    fn is_installed(&self, _cancel: &CancelToken, package: &str) -> Result<bool> {
        Ok(self.installed().contains_key(package))
    }

    fn install_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        cancel.check(package)?;
        if self.is_installed(cancel, package)? {
            return Err(StackmatchError::AlreadyInstalled {
                package: package.to_string(),
            });
        }
        self.log(format!("install {}", package));
        let latest = self
            .repo
            .get(package)
            .and_then(|versions| versions.first())
            .ok_or_else(|| StackmatchError::NotFound {
                package: package.to_string(),
            })?;
        self.put(package, latest)
    }

    /// All-or-nothing, like a single `apt-get install a b c`.
    fn install_multiple(&self, cancel: &CancelToken, packages: &[String]) -> Result<()> {
        cancel.check("install_multiple")?;
        self.log(format!("install_multiple {}", packages.join(" ")));
        if let Some(missing) = packages.iter().find(|p| !self.repo.contains_key(*p)) {
            return Err(StackmatchError::NotFound {
                package: missing.clone(),
            });
        }
        if let Some(broken) = packages.iter().find(|p| self.broken_installs.contains(*p)) {
            return Err(StackmatchError::CommandFailed {
                command: format!("install {}", broken),
                output: "E: Sub-process returned an error code".to_string(),
            });
        }
        for package in packages {
            if let Some(latest) = self.repo.get(package).and_then(|v| v.first()) {
                self.put(package, latest)?;
            }
        }
        Ok(())
    }

    fn uninstall_package(&self, cancel: &CancelToken, package: &str) -> Result<()> {
        cancel.check(package)?;
        if !self.is_installed(cancel, package)? {
            return Ok(());
        }
        self.log(format!("uninstall {}", package));
        if self.broken_uninstalls.contains(package) {
            return Err(StackmatchError::CommandFailed {
                command: format!("remove {}", package),
                output: format!("dpkg: error processing package {}", package),
            });
        }
        self.installed
            .lock()
            .expect("installed lock")
            .remove(package);
        Ok(())
    }

    fn update_package_manager(&self, _cancel: &CancelToken) -> Result<()> {
        self.log("update".to_string());
        Ok(())
    }

    fn get_installed_version(
        &self,
        _cancel: &CancelToken,
        package: &str,
    ) -> Result<PackageVersionInfo> {
        Ok(match self.installed().get(package) {
            Some(version) => PackageVersionInfo::installed(package, version),
            None => PackageVersionInfo::absent(package),
        })
    }

    fn available_versions(&self, _cancel: &CancelToken, package: &str) -> Result<Vec<String>> {
        Ok(self.repo.get(package).cloned().unwrap_or_default())
    }

    fn install_pinned(&self, _cancel: &CancelToken, package: &str, version: &str) -> Result<()> {
        self.log(format!("install {}={}", package, version));
        self.put(package, version)
    }
}
