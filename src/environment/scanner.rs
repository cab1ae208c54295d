//! Detects installed languages, tools, editors and package managers by
//! asking each known executable for its version.

use crate::environment::types::{EnvironmentData, SystemInfo, UNKNOWN_VERSION};
use crate::packages::runner::{CancelToken, CommandMode, CommandRunner};
use crate::ui;
use crate::utils::paths;
use crate::utils::platform::HostOs;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

/// Per-executable budget for `--version` style probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const CONFIG_FILES: &[&str] = &[
    ".gitconfig",
    ".npmrc",
    ".zshrc",
    ".bashrc",
    ".bash_profile",
    ".profile",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Language,
    Tool,
    Editor,
    PackageManager,
}

pub struct Probe {
    /// Display name used as the snapshot key.
    pub name: &'static str,
    pub command: &'static str,
    pub version_arg: &'static str,
    pub pattern: Regex,
    pub category: Category,
    /// Logical package that installs it, when there is one.
    pub package: Option<&'static str>,
}

fn probe(
    name: &'static str,
    command: &'static str,
    version_arg: &'static str,
    pattern: &str,
    category: Category,
    package: Option<&'static str>,
) -> Probe {
    Probe {
        name,
        command,
        version_arg,
        pattern: Regex::new(pattern).expect("Invalid regex pattern"),
        category,
        package,
    }
}

static PROBES: LazyLock<Vec<Probe>> = LazyLock::new(|| {
    use Category::*;
    vec![
        probe("Go", "go", "version", r"go version go([\d.]+)", Language, Some("golang")),
        probe("Node.js", "node", "--version", r"v?([\d.]+)", Language, Some("nodejs")),
        probe("Python", "python", "--version", r"Python ([\d.]+)", Language, None),
        probe("Python 3", "python3", "--version", r"Python ([\d.]+)", Language, Some("python3")),
        probe("Git", "git", "--version", r"git version ([\d.]+)", Tool, Some("git")),
        probe("Docker", "docker", "--version", r"Docker version ([\d.]+)", Tool, Some("docker")),
        probe("npm", "npm", "--version", r"([\d.]+)", Tool, None),
        probe("yarn", "yarn", "--version", r"([\d.]+)", Tool, None),
        probe("pnpm", "pnpm", "--version", r"([\d.]+)", Tool, None),
        probe("VS Code", "code", "--version", r"([\d.]+)", Editor, Some("vscode")),
        probe("pip", "pip", "--version", r"pip ([\d.]+)", PackageManager, None),
        probe("pip3", "pip3", "--version", r"pip ([\d.]+)", PackageManager, None),
        probe("apt-get", "apt-get", "--version", r"apt ([\d.]+)", PackageManager, None),
        probe("dnf", "dnf", "--version", r"([\d.]+)", PackageManager, None),
        probe("yum", "yum", "--version", r"([\d.]+)", PackageManager, None),
        probe("pacman", "pacman", "--version", r"Pacman v([\d.]+)", PackageManager, None),
        probe("snap", "snap", "--version", r"snap\s+([\d.]+)", PackageManager, None),
        probe("Homebrew", "brew", "--version", r"Homebrew ([\d.]+)", PackageManager, None),
        probe("Chocolatey", "choco", "--version", r"([\d.]+)", PackageManager, None),
        probe("scoop", "scoop", "--version", r"v([\d.]+)", PackageManager, None),
        probe("winget", "winget", "--version", r"v?([\d.]+)", PackageManager, None),
    ]
});

pub fn probes() -> &'static [Probe] {
    &PROBES
}

/// Logical package for a snapshot entry name.
pub fn package_for(name: &str) -> Option<&'static str> {
    PROBES.iter().find(|p| p.name == name).and_then(|p| p.package)
}

pub struct Scanner {
    runner: Arc<dyn CommandRunner>,
    cancel: CancelToken,
}

impl Scanner {
    pub fn new(runner: Arc<dyn CommandRunner>, cancel: CancelToken) -> Self {
        Self { runner, cancel }
    }

    pub fn scan(&self) -> EnvironmentData {
        let mut data = EnvironmentData::new(detect_system_info());

        for probe in probes() {
            if self.cancel.is_cancelled() {
                break;
            }
            let Some(version) = self.detect(probe) else {
                continue;
            };
            ui::debug(&format!("Found {} {}", probe.name, version));
            let section = match probe.category {
                Category::Language => &mut data.configured_languages,
                Category::Tool => &mut data.tools,
                Category::Editor => &mut data.code_editors,
                Category::PackageManager => &mut data.package_managers,
            };
            section.insert(probe.name.to_string(), version);
        }

        if let Some(home) = paths::home_dir() {
            data.config_files = detect_config_files(&home);
        }
        data
    }

    /// Version of a probe's executable, `UNKNOWN_VERSION` when it exists
    /// but says nothing parseable, `None` when it is not on PATH.
    fn detect(&self, probe: &Probe) -> Option<String> {
        if !self.runner.lookup(probe.command) {
            return None;
        }

        let cancel = self.cancel.with_timeout(PROBE_TIMEOUT);
        let args = vec![probe.version_arg.to_string()];
        let version = match self
            .runner
            .run(probe.command, &args, CommandMode::Query, &cancel)
        {
            Ok(out) => {
                // Some tools (older pythons) print their version to stderr
                let text = if out.success && !out.stdout.trim().is_empty() {
                    out.stdout
                } else {
                    out.stderr
                };
                parse_version(&text, &probe.pattern)
            }
            Err(e) => {
                ui::debug(&format!("'{} {}' failed: {}", probe.command, probe.version_arg, e));
                None
            }
        };
        Some(version.unwrap_or_else(|| UNKNOWN_VERSION.to_string()))
    }
}

fn parse_version(output: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_end_matches('.').to_string())
        .filter(|v| !v.is_empty())
}

pub fn detect_system_info() -> SystemInfo {
    SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        shell: detect_shell(),
        hostname: hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

fn detect_shell() -> String {
    match HostOs::current() {
        HostOs::Windows => std::env::var("COMSPEC")
            .ok()
            .or_else(|| {
                ["powershell.exe", "pwsh.exe"]
                    .into_iter()
                    .find(|shell| which::which(shell).is_ok())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "cmd.exe".to_string()),
        _ => std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string()),
    }
}

/// Well-known dotfiles present in `home`.
pub fn detect_config_files(home: &Path) -> Vec<String> {
    CONFIG_FILES
        .iter()
        .map(|name| home.join(name))
        .filter(|path| path.exists())
        .map(|path| path.display().to_string())
        .collect()
}
