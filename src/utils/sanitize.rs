//! Input validation for anything that ends up in a package manager argv.
//!
//! Commands are spawned without a shell, so the concern here is option
//! injection (`--foo` passed as a package) and garbage that no repository
//! could ever serve.

use crate::error::{Result, StackmatchError};
use regex::Regex;
use std::sync::LazyLock;

/// Allows: alphanumeric, dash, underscore, dot, plus, at sign, slash
static SAFE_PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9@._+/-]+$").expect("Invalid regex pattern"));

/// Native version strings: digits, letters, and the usual separators
/// including Debian's epoch colon and tilde.
static SAFE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.+~:_-]+$").expect("Invalid regex pattern"));

static SHELL_DANGEROUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[;`$(){}|&<>\\'"\n\r\t ]"#).expect("Invalid regex pattern"));

pub fn validate_package_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StackmatchError::ConfigError(
            "Package name cannot be empty".to_string(),
        ));
    }

    if name.len() > 256 {
        return Err(StackmatchError::ConfigError(format!(
            "Package name too long (max 256 chars): {}...",
            name.chars().take(50).collect::<String>()
        )));
    }

    if name.starts_with('-') {
        return Err(StackmatchError::ConfigError(format!(
            "Package name cannot start with '-': {}",
            name
        )));
    }

    if SHELL_DANGEROUS.is_match(name) {
        return Err(StackmatchError::ConfigError(format!(
            "Package name contains unsafe characters: {}",
            name
        )));
    }

    if !SAFE_PACKAGE_NAME.is_match(name) {
        return Err(StackmatchError::ConfigError(format!(
            "Package name contains invalid characters: {}",
            name
        )));
    }

    if name.contains("..") {
        return Err(StackmatchError::ConfigError(format!(
            "Package name cannot contain path traversal: {}",
            name
        )));
    }

    Ok(())
}

pub fn validate_package_names(names: &[String]) -> Result<()> {
    for name in names {
        validate_package_name(name)?;
    }
    Ok(())
}

/// Validate a concrete version that will be pinned on the command line.
pub fn validate_version(version: &str) -> Result<()> {
    if version.is_empty() || version.starts_with('-') || !SAFE_VERSION.is_match(version) {
        return Err(StackmatchError::InvalidVersion(version.to_string()));
    }
    Ok(())
}

/// Truncate long command lines for log output.
pub fn sanitize_for_display(input: &str) -> String {
    if input.chars().count() > 200 {
        format!("{}...", input.chars().take(200).collect::<String>())
    } else {
        input.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_package_names() {
        assert!(validate_package_name("ripgrep").is_ok());
        assert!(validate_package_name("postgresql@14").is_ok());
        assert!(validate_package_name("python3.12").is_ok());
        assert!(validate_package_name("OpenJS.NodeJS").is_ok());
        assert!(validate_package_name("docker.io").is_ok());
        assert!(validate_package_name("g++").is_ok());
    }

    #[test]
    fn test_shell_injection_blocked() {
        assert!(validate_package_name("foo; rm -rf /").is_err());
        assert!(validate_package_name("foo | cat").is_err());
        assert!(validate_package_name("foo$(cat)").is_err());
        assert!(validate_package_name("foo && echo").is_err());
    }

    #[test]
    fn test_option_injection_blocked() {
        assert!(validate_package_name("--purge").is_err());
        assert!(validate_package_name("-y").is_err());
        assert!(validate_version("--force").is_err());
    }

    #[test]
    fn test_path_traversal_blocked() {
        assert!(validate_package_name("../../../etc/passwd").is_err());
        assert!(validate_package_name("foo/../bar").is_err());
    }

    #[test]
    fn test_empty_and_long_names() {
        assert!(validate_package_name("").is_err());
        let long_name = "a".repeat(300);
        assert!(validate_package_name(&long_name).is_err());
    }

    #[test]
    fn test_native_versions() {
        assert!(validate_version("1:2.34.1-1ubuntu1").is_ok());
        assert!(validate_version("1.2~rc1").is_ok());
        assert!(validate_version("").is_err());
        assert!(validate_version("1.0 && id").is_err());
    }
}
