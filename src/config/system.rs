//! Host-level settings (`conf/system.toml`).
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::toml_loader::load_config;
use crate::error::ConfigError;

/// Timezone, fstab and power-management settings.
///
/// ```toml
/// timezone = "Europe/London"
/// fstab_nofail = true
/// disable_sleep = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// IANA timezone to set, if any.
    pub timezone: Option<String>,
    /// Add `nofail` to optional fstab mounts.
    pub fstab_nofail: bool,
    /// Mask the systemd sleep targets.
    pub disable_sleep: bool,
    /// fstab to harden.
    pub fstab: PathBuf,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            timezone: None,
            fstab_nofail: false,
            disable_sleep: false,
            fstab: PathBuf::from("/etc/fstab"),
        }
    }
}

impl SystemSettings {
    /// Whether neither a timezone nor sleep masking is configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.timezone.is_none() && !self.disable_sleep
    }
}

/// Load system settings.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<SystemSettings, ConfigError> {
    load_config(path)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let settings: SystemSettings = toml::from_str("").unwrap();
        assert_eq!(settings, SystemSettings::default());
        assert_eq!(settings.fstab, PathBuf::from("/etc/fstab"));
        assert!(settings.is_empty());
    }

    #[test]
    fn parses_all_keys() {
        let settings: SystemSettings = toml::from_str(
            "timezone = \"Europe/London\"\nfstab_nofail = true\ndisable_sleep = true\n",
        )
        .unwrap();
        assert_eq!(settings.timezone.as_deref(), Some("Europe/London"));
        assert!(settings.fstab_nofail);
        assert!(!settings.is_empty());
    }
}
