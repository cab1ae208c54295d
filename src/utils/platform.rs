use crate::error::Result;
use std::fmt;
use std::process::Command;

/// Host operating system family, as far as package-manager detection cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    Other(String),
}

impl HostOs {
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => Self::Linux,
            "macos" | "darwin" => Self::MacOs,
            "windows" => Self::Windows,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => f.write_str("linux"),
            Self::MacOs => f.write_str("macos"),
            Self::Windows => f.write_str("windows"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Build a direct program invocation in a platform-aware way.
///
/// - Unix: `program args...` or `sudo program args...`
/// - Windows: `program args...` (elevation is left to the caller's shell)
pub fn build_program_command(program: &str, args: &[String], elevated: bool) -> Result<Command> {
    #[cfg(unix)]
    {
        let cmd = if elevated {
            let mut c = Command::new("sudo");
            c.arg(program);
            c.args(args);
            c
        } else {
            let mut c = Command::new(program);
            c.args(args);
            c
        };

        Ok(cmd)
    }

    #[cfg(not(unix))]
    {
        if elevated {
            return Err(crate::error::StackmatchError::Other(
                "Elevated execution is only supported on Unix; run from an elevated shell instead"
                    .to_string(),
            ));
        }

        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }
}
