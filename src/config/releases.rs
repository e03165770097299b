//! GitHub release binaries (`conf/releases.toml`).
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::toml_loader::{expand_path, load_config};
use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct ReleasesFile {
    #[serde(default, rename = "release")]
    releases: Vec<RawRelease>,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    repo: String,
    asset: String,
    binary: String,
    #[serde(default = "default_install_dir")]
    install_dir: String,
    #[serde(default)]
    link_dir: Option<String>,
}

fn default_install_dir() -> String {
    "~/.local/bin".to_string()
}

/// A binary installed from the latest release of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseBinary {
    /// Repository slug, `owner/name`.
    pub repo: String,
    /// Substring selecting the asset.
    pub asset: String,
    /// Executable name inside the asset.
    pub binary: String,
    /// Install directory.
    pub install_dir: PathBuf,
    /// Optional directory that receives a symlink.
    pub link_dir: Option<PathBuf>,
}

/// Load release definitions.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path, home: &Path) -> Result<Vec<ReleaseBinary>, ConfigError> {
    let file: ReleasesFile = load_config(path)?;
    Ok(file
        .releases
        .into_iter()
        .map(|raw| ReleaseBinary {
            repo: raw.repo,
            asset: raw.asset,
            binary: raw.binary,
            install_dir: expand_path(&raw.install_dir, home),
            link_dir: raw.link_dir.map(|d| expand_path(&d, home)),
        })
        .collect())
}
