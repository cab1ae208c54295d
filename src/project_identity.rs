//! Central project identity contract.
//!
//! Single source of truth for names that end up on disk or in the environment.

pub const DISPLAY_NAME: &str = "Stackmatch";
pub const BINARY_NAME: &str = "stackmatch";
pub const STABLE_PROJECT_ID: &str = "stackmatch";
pub const ENV_PREFIX: &str = "STACKMATCH";
pub const CONFIG_FILE_BASENAME: &str = "stackmatch.kdl";
pub const JOURNAL_FILE_BASENAME: &str = "installations.json";

pub fn env_key(suffix: &str) -> String {
    format!("{}_{}", ENV_PREFIX, suffix)
}

pub fn cli_with(args: &str) -> String {
    format!("{} {}", BINARY_NAME, args)
}
