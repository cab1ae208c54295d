use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackmatchError {
    #[error("Package '{package}' is already installed")]
    AlreadyInstalled { package: String },

    #[error("Package '{package}' was not found in the package repositories")]
    NotFound { package: String },

    #[error("Command '{command}' failed:\n{output}")]
    CommandFailed { command: String, output: String },

    #[error("System command '{command}' failed: {reason}")]
    SystemCommandFailed { command: String, reason: String },

    #[error("Command '{command}' timed out after {}", describe_budget(.budget))]
    TimedOut { command: String, budget: Duration },

    #[error("Command '{command}' was cancelled")]
    Interrupted { command: String },

    #[error("No supported package manager found on {os}")]
    NoSupportedManagerFound { os: String },

    #[error("Invalid version format: '{0}'")]
    InvalidVersion(String),

    #[error("Invalid version constraint '{constraint}': {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("No mapping for package '{package}' with package manager {manager}")]
    NoMappingForManager { package: String, manager: String },

    #[error("Package mapping name cannot be empty")]
    EmptyMappingName,

    #[error("Package mapping '{name}' must name at least one package manager")]
    NoManagerEntries { name: String },

    #[error("No available version of '{package}' satisfies '{constraint}'")]
    NoMatchingVersion { package: String, constraint: String },

    #[error("{manager} does not support {operation}")]
    UnsupportedOperation { manager: String, operation: String },

    #[error("Installation record not found: {0}")]
    RecordNotFound(String),

    #[error("failed to install packages: {}", join_failures(.failures))]
    BatchFailed { failures: Vec<(String, String)> },

    #[error("rollback failed for packages: {}", join_failures(.failures))]
    RollbackFailed { failures: Vec<(String, String)> },

    #[error("Verification of '{package}' failed: {reason}")]
    VerificationFailed { package: String, reason: String },

    #[error("{manager} failed to {phase} '{package}': {source}")]
    PackageOperation {
        manager: String,
        package: String,
        phase: String,
        #[source]
        source: Box<StackmatchError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error at '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    StdIoError(#[from] std::io::Error),

    #[error("KDL parse error: {0}")]
    KdlError(#[from] kdl::KdlError),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Lock acquisition failed (e.g., mutex poisoned)
    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    /// Path resolution or validation error
    #[error("Path error: {0}")]
    PathError(String),

    #[error("{0}")]
    Other(String),
}

impl StackmatchError {
    /// True for `AlreadyInstalled`, including when wrapped with operation context.
    pub fn is_already_installed(&self) -> bool {
        match self {
            Self::AlreadyInstalled { .. } => true,
            Self::PackageOperation { source, .. } => source.is_already_installed(),
            _ => false,
        }
    }

    /// True for `NotFound`, including when wrapped with operation context.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::PackageOperation { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Interrupted { .. } => true,
            Self::PackageOperation { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Attach manager/package/phase context. Soft conditions are left bare so
    /// callers can match them directly.
    pub fn in_operation(self, manager: &str, package: &str, phase: &str) -> Self {
        match self {
            Self::AlreadyInstalled { .. }
            | Self::NotFound { .. }
            | Self::PackageOperation { .. }
            | Self::InvalidConstraint { .. }
            | Self::NoMatchingVersion { .. }
            | Self::UnsupportedOperation { .. } => self,
            other => Self::PackageOperation {
                manager: manager.to_string(),
                package: package.to_string(),
                phase: phase.to_string(),
                source: Box::new(other),
            },
        }
    }
}

fn describe_budget(budget: &Duration) -> String {
    match budget.as_secs() {
        0 => format!("{} ms", budget.as_millis()),
        1 if budget.subsec_nanos() == 0 => "1 second".to_string(),
        _ if budget.subsec_nanos() == 0 => format!("{} seconds", budget.as_secs()),
        _ => format!("{:.1} seconds", budget.as_secs_f64()),
    }
}

fn join_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(name, reason)| format!("{}: {}", name, reason))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, StackmatchError>;
