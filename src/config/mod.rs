//! Configuration loaded from `conf/*.toml` under the repository root.
pub mod blocks;
pub mod packages;
pub mod releases;
pub mod settings;
pub mod system;
pub mod toml_loader;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// All loaded configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Repository root (the directory containing `conf/`).
    pub root: PathBuf,
    /// Package catalog from `packages.toml`.
    pub packages: packages::PackageCatalog,
    /// Blocks from `blocks.toml`.
    pub blocks: Vec<blocks::Block>,
    /// Line settings from `settings.toml`.
    pub settings: Vec<settings::FileSetting>,
    /// Release binaries from `releases.toml`.
    pub releases: Vec<releases::ReleaseBinary>,
    /// Host settings from `system.toml`.
    pub system: system::SystemSettings,
}

impl Config {
    /// Load every configuration file from `<root>/conf`.
    ///
    /// Missing files load as empty sections.
    ///
    /// # Errors
    ///
    /// Returns an error if any present file cannot be read or parsed.
    pub fn load(root: &Path, home: &Path) -> Result<Self, ConfigError> {
        let conf = root.join("conf");

        Ok(Self {
            root: root.to_path_buf(),
            packages: packages::load(&conf.join("packages.toml"))?,
            blocks: blocks::load(&conf.join("blocks.toml"), root, home)?,
            settings: settings::load(&conf.join("settings.toml"), home)?,
            releases: releases::load(&conf.join("releases.toml"), home)?,
            system: system::load(&conf.join("system.toml"))?,
        })
    }

    /// A configuration with every section empty.
    #[must_use]
    pub fn empty(root: PathBuf) -> Self {
        Self {
            root,
            packages: packages::PackageCatalog::default(),
            blocks: Vec::new(),
            settings: Vec::new(),
            releases: Vec::new(),
            system: system::SystemSettings::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn load_empty_conf_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("conf")).unwrap();
        let config = Config::load(dir.path(), Path::new("/home/u")).unwrap();
        assert!(config.packages.groups.is_empty());
        assert!(config.blocks.is_empty());
        assert!(config.settings.is_empty());
        assert!(config.releases.is_empty());
        assert!(config.system.is_empty());
    }

    #[test]
    fn load_reports_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("conf")).unwrap();
        std::fs::write(dir.path().join("conf/system.toml"), "timezone = 3\n").unwrap();
        let err = Config::load(dir.path(), Path::new("/home/u")).unwrap_err();
        assert!(err.to_string().contains("system.toml"), "{err}");
    }

    #[test]
    fn shipped_configuration_parses() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let config = Config::load(root, Path::new("/home/u")).unwrap();
        assert!(!config.packages.groups.is_empty());
        assert!(!config.blocks.is_empty());
        for block in &config.blocks {
            assert!(block.source.is_file(), "{} missing", block.source.display());
        }
        assert!(validation::validate_all(&config).is_empty());
    }
}
