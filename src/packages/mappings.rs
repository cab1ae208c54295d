//! Logical package names and what each package manager calls them.
//!
//! Lookups are advisory: a logical name nobody registered passes through
//! unchanged, but a registered name that leaves a manager out is an error,
//! since guessing there would install the wrong thing.

use crate::core::types::PackageManagerType;
use crate::error::{Result, StackmatchError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMapping {
    pub name: String,
    pub description: String,
    pub packages: BTreeMap<PackageManagerType, String>,
}

impl PackageMapping {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            packages: BTreeMap::new(),
        }
    }

    pub fn with(mut self, manager: PackageManagerType, package: &str) -> Self {
        self.packages.insert(manager, package.to_string());
        self
    }

    /// The same name for every manager except Snap, then overrides. Snap
    /// only gets an entry through an override.
    fn uniform(name: &str, description: &str, overrides: &[(PackageManagerType, &str)]) -> Self {
        let mut mapping = Self::new(name, description);
        for manager in PackageManagerType::ALL {
            if manager != PackageManagerType::Snap {
                mapping.packages.insert(manager, name.to_string());
            }
        }
        for (manager, package) in overrides {
            mapping.packages.insert(*manager, package.to_string());
        }
        mapping
    }
}

/// Ordered mapping table. Registration appends; the first entry whose name
/// matches (case-insensitively) wins a lookup.
#[derive(Debug, Clone)]
pub struct PackageMappings {
    entries: Vec<PackageMapping>,
}

impl Default for PackageMappings {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PackageMappings {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Seed table shipped with the tool.
    pub fn builtin() -> Self {
        use PackageManagerType::*;

        Self {
            entries: vec![
                PackageMapping::uniform(
                    "nodejs",
                    "Node.js JavaScript runtime",
                    &[(Homebrew, "node"), (Winget, "OpenJS.NodeJS")],
                ),
                PackageMapping::uniform(
                    "python3",
                    "Python 3 interpreter",
                    &[
                        (Pacman, "python"),
                        (Homebrew, "python"),
                        (Chocolatey, "python"),
                        (Scoop, "python"),
                        (Winget, "Python.Python.3"),
                    ],
                ),
                PackageMapping::uniform(
                    "git",
                    "Distributed version control system",
                    &[(Winget, "Git.Git")],
                ),
                PackageMapping::uniform(
                    "postgresql",
                    "PostgreSQL database server",
                    &[
                        (Dnf, "postgresql-server"),
                        (Yum, "postgresql-server"),
                        (Homebrew, "postgresql@14"),
                        (Winget, "PostgreSQL.pgAdmin"),
                    ],
                ),
                PackageMapping::uniform(
                    "docker",
                    "Docker container platform",
                    &[
                        (Apt, "docker.io"),
                        (Chocolatey, "docker-desktop"),
                        (Winget, "Docker.DockerDesktop"),
                    ],
                ),
                PackageMapping::uniform(
                    "golang",
                    "Go toolchain",
                    &[
                        (Pacman, "go"),
                        (Snap, "go"),
                        (Homebrew, "go"),
                        (Scoop, "go"),
                        (Winget, "GoLang.Go"),
                    ],
                ),
                PackageMapping::uniform(
                    "vscode",
                    "Visual Studio Code editor",
                    &[
                        (Apt, "code"),
                        (Dnf, "code"),
                        (Yum, "code"),
                        (Pacman, "code"),
                        (Snap, "code"),
                        (Homebrew, "visual-studio-code"),
                        (Winget, "Microsoft.VisualStudioCode"),
                    ],
                ),
            ],
        }
    }

    /// Name `logical` goes by under `manager`.
    pub fn package_name(&self, logical: &str, manager: PackageManagerType) -> Result<String> {
        let Some(mapping) = self
            .entries
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(logical))
        else {
            return Ok(logical.to_string());
        };

        mapping
            .packages
            .get(&manager)
            .cloned()
            .ok_or_else(|| StackmatchError::NoMappingForManager {
                package: logical.to_string(),
                manager: manager.display_name().to_string(),
            })
    }

    /// Register a mapping. No deduplication: an earlier entry with the same
    /// name keeps answering lookups.
    pub fn add_mapping(&mut self, mapping: PackageMapping) -> Result<()> {
        if mapping.name.trim().is_empty() {
            return Err(StackmatchError::EmptyMappingName);
        }
        if mapping.packages.is_empty() {
            return Err(StackmatchError::NoManagerEntries { name: mapping.name });
        }
        self.entries.push(mapping);
        Ok(())
    }

    pub fn all(&self) -> &[PackageMapping] {
        &self.entries
    }

    /// Logical name whose mapping for `manager` is `native`, if any.
    pub fn logical_name(&self, native: &str, manager: PackageManagerType) -> Option<&str> {
        self.entries
            .iter()
            .find(|m| m.packages.get(&manager).is_some_and(|p| p == native))
            .map(|m| m.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PackageManagerType::*;

    #[test]
    fn snap_is_only_mapped_where_the_store_name_is_known() {
        let table = PackageMappings::builtin();
        for logical in ["nodejs", "python3", "git", "postgresql", "docker"] {
            assert!(matches!(
                table.package_name(logical, Snap),
                Err(StackmatchError::NoMappingForManager { .. })
            ));
        }
        assert_eq!(table.package_name("golang", Snap).unwrap(), "go");
        assert_eq!(table.package_name("vscode", Snap).unwrap(), "code");
    }

    #[test]
    fn known_names_translate_per_manager() {
        let table = PackageMappings::builtin();
        assert_eq!(table.package_name("nodejs", Homebrew).unwrap(), "node");
        assert_eq!(table.package_name("NodeJS", Winget).unwrap(), "OpenJS.NodeJS");
        assert_eq!(table.package_name("nodejs", Apt).unwrap(), "nodejs");
        assert_eq!(table.package_name("docker", Apt).unwrap(), "docker.io");
        assert_eq!(table.package_name("postgresql", Dnf).unwrap(), "postgresql-server");
    }

    #[test]
    fn unknown_names_pass_through() {
        let table = PackageMappings::builtin();
        assert_eq!(
            table.package_name("unknown-logical-name", Apt).unwrap(),
            "unknown-logical-name"
        );
    }

    #[test]
    fn missing_manager_entry_is_an_error() {
        let mut table = PackageMappings::empty();
        table
            .add_mapping(PackageMapping::new("ripgrep", "Fast grep").with(Apt, "ripgrep"))
            .unwrap();
        let err = table.package_name("ripgrep", Winget).unwrap_err();
        assert!(matches!(err, StackmatchError::NoMappingForManager { .. }));
    }

    #[test]
    fn registration_validates_and_appends() {
        let mut table = PackageMappings::builtin();
        assert!(matches!(
            table.add_mapping(PackageMapping::new("", "nothing").with(Apt, "x")),
            Err(StackmatchError::EmptyMappingName)
        ));
        assert!(matches!(
            table.add_mapping(PackageMapping::new("fd", "find")),
            Err(StackmatchError::NoManagerEntries { .. })
        ));

        let before = table.all().len();
        table
            .add_mapping(PackageMapping::new("nodejs", "shadowed").with(Homebrew, "node@20"))
            .unwrap();
        assert_eq!(table.all().len(), before + 1);
        assert_eq!(table.package_name("nodejs", Homebrew).unwrap(), "node");
    }

    #[test]
    fn reverse_lookup_finds_logical_name() {
        let table = PackageMappings::builtin();
        assert_eq!(table.logical_name("docker.io", Apt), Some("docker"));
        assert_eq!(table.logical_name("ripgrep", Apt), None);
    }
}
