//! Line settings for system config files (`conf/settings.toml`).
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::toml_loader::{expand_path, load_config};
use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default, rename = "setting")]
    settings: Vec<RawSetting>,
}

#[derive(Debug, Deserialize)]
struct RawSetting {
    file: String,
    key: String,
    value: String,
    #[serde(default = "default_separator")]
    separator: String,
    #[serde(default)]
    restart: Option<String>,
}

fn default_separator() -> String {
    " ".to_string()
}

/// A `key<separator>value` line that must be active in `file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSetting {
    /// File to edit.
    pub file: PathBuf,
    /// Setting name.
    pub key: String,
    /// Desired value.
    pub value: String,
    /// Text between key and value.
    pub separator: String,
    /// Service restarted when this setting changes.
    pub restart: Option<String>,
}

/// Load file settings.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path, home: &Path) -> Result<Vec<FileSetting>, ConfigError> {
    let file: SettingsFile = load_config(path)?;
    Ok(file
        .settings
        .into_iter()
        .map(|raw| FileSetting {
            file: expand_path(&raw.file, home),
            key: raw.key,
            value: raw.value,
            separator: raw.separator,
            restart: raw.restart.filter(|s| !s.trim().is_empty()),
        })
        .collect())
}
