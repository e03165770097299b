//! Generic TOML file loading and path expansion.
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Load a TOML file into `T`.
///
/// A missing file yields `T::default()` so every `conf/*.toml` file is
/// optional.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read, or
/// [`ConfigError::Parse`] if it is not valid TOML for `T`.
pub fn load_config<T: DeserializeOwned + Default>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Expand `~` and `$VARS` in a configured path.
///
/// Unknown variables are left as written.
#[must_use]
pub fn expand_path(raw: &str, home: &Path) -> PathBuf {
    let expanded = shellexpand::full_with_context_no_errors(
        raw,
        || home.to_str(),
        |var| std::env::var(var).ok(),
    );
    PathBuf::from(expanded.as_ref())
}
