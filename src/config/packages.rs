//! Package catalog (`conf/packages.toml`).
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use super::toml_loader::load_config;
use crate::error::ConfigError;

/// One catalog package: either a bare name or a table with a description.
///
/// ```toml
/// packages = ["htop", { name = "ncdu", description = "disk usage browser" }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CatalogPackage {
    /// Package name only.
    Name(String),
    /// Package name with a description.
    Detailed {
        /// Package name.
        name: String,
        /// What the package is for.
        #[serde(default)]
        description: Option<String>,
    },
}

impl CatalogPackage {
    /// Package name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }

    /// Description, if one was given.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Detailed { description, .. } => description.as_deref(),
        }
    }
}

/// A named group of packages.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageGroup {
    /// Group name, shown as the `--- NAME ---` header.
    pub name: String,
    /// Optional one-line description of the group.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether `install` installs this group.
    #[serde(default = "default_install")]
    pub install: bool,
    /// Packages in the group.
    #[serde(default)]
    pub packages: Vec<CatalogPackage>,
}

const fn default_install() -> bool {
    true
}

/// All package groups, in file order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageCatalog {
    /// The `[[group]]` tables.
    #[serde(default, rename = "group")]
    pub groups: Vec<PackageGroup>,
}

impl PackageCatalog {
    /// Names of packages in groups marked `install`, de-duplicated in order.
    #[must_use]
    pub fn install_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.groups
            .iter()
            .filter(|g| g.install)
            .flat_map(|g| g.packages.iter())
            .map(CatalogPackage::name)
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect()
    }

    /// Find a group by name (case-insensitive).
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&PackageGroup> {
        self.groups
            .iter()
            .find(|g| g.name.eq_ignore_ascii_case(name))
    }
}

/// Load the package catalog.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<PackageCatalog, ConfigError> {
    load_config(path)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[[group]]
name = "Essentials"
description = "Tools every machine gets"
packages = ["git", "curl", { name = "htop", description = "process viewer" }]

[[group]]
name = "Extras"
install = false
packages = ["cowsay", "git"]

[[group]]
name = "Network"
packages = ["curl", "nmap"]
"#;

    fn catalog() -> PackageCatalog {
        toml::from_str(CATALOG).unwrap()
    }

    #[test]
    fn groups_parse_in_file_order() {
        let catalog = catalog();
        let names: Vec<&str> = catalog.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Essentials", "Extras", "Network"]);
        assert!(catalog.groups[0].install);
        assert!(!catalog.groups[1].install);
    }

    #[test]
    fn packages_accept_string_or_table() {
        let catalog = catalog();
        let pkgs = &catalog.groups[0].packages;
        assert_eq!(pkgs[0], CatalogPackage::Name("git".to_string()));
        assert_eq!(pkgs[2].name(), "htop");
        assert_eq!(pkgs[2].description(), Some("process viewer"));
        assert_eq!(pkgs[0].description(), None);
    }

    #[test]
    fn install_names_skip_disabled_groups_and_duplicates() {
        assert_eq!(catalog().install_names(), vec!["git", "curl", "htop", "nmap"]);
    }

    #[test]
    fn group_lookup_is_case_insensitive() {
        let catalog = catalog();
        assert_eq!(catalog.group("network").map(|g| g.packages.len()), Some(2));
        assert!(catalog.group("missing").is_none());
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = load(&dir.path().join("packages.toml")).unwrap();
        assert!(catalog.groups.is_empty());
    }
}
