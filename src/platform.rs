//! Operating system, package manager and desktop environment detection.
use std::fmt;

use crate::error::PlatformError;
use crate::exec::Executor;
use crate::resources::package::PackageManager;

/// Detected operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Any Linux distribution.
    Linux,
    /// Anything else; most tasks refuse to run.
    Other,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Other => write!(f, "{}", std::env::consts::OS),
        }
    }
}

/// Desktop environment of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Desktop {
    /// GNOME (including Ubuntu's GNOME session).
    Gnome,
    /// KDE Plasma.
    Kde,
    /// Xfce.
    Xfce,
    /// Cinnamon.
    Cinnamon,
    /// MATE.
    Mate,
    /// LXDE / LXQt.
    Lxde,
    /// Unrecognised `XDG_CURRENT_DESKTOP` value.
    Other(String),
}

impl Desktop {
    /// Session binaries probed, in order, when `XDG_CURRENT_DESKTOP` is unset.
    const PROBES: &[(&str, Self)] = &[
        ("gnome-shell", Self::Gnome),
        ("plasmashell", Self::Kde),
        ("xfce4-session", Self::Xfce),
        ("cinnamon-session", Self::Cinnamon),
        ("mate-session", Self::Mate),
        ("lxsession", Self::Lxde),
    ];

    /// Interpret an `XDG_CURRENT_DESKTOP` value such as `ubuntu:GNOME`.
    #[must_use]
    pub fn from_xdg(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let known = value.split(':').find_map(|part| {
            match part.trim().to_ascii_lowercase().as_str() {
                "gnome" | "gnome-classic" | "gnome-flashback" => Some(Self::Gnome),
                "kde" | "plasma" => Some(Self::Kde),
                "xfce" => Some(Self::Xfce),
                "x-cinnamon" | "cinnamon" => Some(Self::Cinnamon),
                "mate" => Some(Self::Mate),
                "lxde" | "lxqt" => Some(Self::Lxde),
                _ => None,
            }
        });
        Some(known.unwrap_or_else(|| Self::Other(value.to_string())))
    }
}

impl fmt::Display for Desktop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gnome => write!(f, "GNOME"),
            Self::Kde => write!(f, "KDE Plasma"),
            Self::Xfce => write!(f, "Xfce"),
            Self::Cinnamon => write!(f, "Cinnamon"),
            Self::Mate => write!(f, "MATE"),
            Self::Lxde => write!(f, "LXDE"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// `PRETTY_NAME` from `/etc/os-release`, when readable.
    pub distro: Option<String>,
    /// First supported package manager found on PATH.
    pub package_manager: Option<PackageManager>,
    /// Desktop environment, if any.
    pub desktop: Option<Desktop>,
    /// Whether the process runs with uid 0.
    pub is_root: bool,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect(executor: &dyn Executor) -> Self {
        let os = if cfg!(target_os = "linux") {
            Os::Linux
        } else {
            Os::Other
        };
        let distro = std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|text| parse_os_release(&text));
        let xdg = std::env::var("XDG_CURRENT_DESKTOP").ok();

        Self {
            os,
            distro,
            package_manager: detect_package_manager(executor),
            desktop: detect_desktop(xdg.as_deref(), executor),
            is_root: detect_root(executor),
        }
    }

    /// Create a Linux platform with explicit values (for testing).
    #[must_use]
    pub const fn new(package_manager: Option<PackageManager>, is_root: bool) -> Self {
        Self {
            os: Os::Linux,
            distro: None,
            package_manager,
            desktop: None,
            is_root,
        }
    }

    /// Whether the current OS is Linux.
    #[must_use]
    pub fn is_linux(&self) -> bool {
        self.os == Os::Linux
    }

    /// The detected package manager, or an error naming what was probed.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NoPackageManager`] if none was found.
    pub fn require_package_manager(&self) -> Result<PackageManager, PlatformError> {
        self.package_manager.ok_or_else(|| {
            let tried: Vec<String> = PackageManager::PROBE_ORDER
                .iter()
                .map(ToString::to_string)
                .collect();
            PlatformError::NoPackageManager(tried.join(", "))
        })
    }

    /// Fail unless running on Linux.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unsupported`] on any other OS.
    pub fn require_linux(&self) -> Result<(), PlatformError> {
        if self.is_linux() {
            Ok(())
        } else {
            Err(PlatformError::Unsupported {
                platform: self.os.to_string(),
            })
        }
    }

    /// Whether privileged commands must be prefixed with `sudo`.
    #[must_use]
    pub const fn needs_sudo(&self) -> bool {
        !self.is_root
    }
}

/// Probe PATH for the supported package managers in their fixed order.
#[must_use]
pub fn detect_package_manager(executor: &dyn Executor) -> Option<PackageManager> {
    PackageManager::PROBE_ORDER
        .iter()
        .copied()
        .find(|pm| executor.which(pm.probe_binary()))
}

/// Determine the desktop environment from `XDG_CURRENT_DESKTOP`, falling back
/// to probing for well-known session binaries.
#[must_use]
pub fn detect_desktop(xdg_current_desktop: Option<&str>, executor: &dyn Executor) -> Option<Desktop> {
    xdg_current_desktop.and_then(Desktop::from_xdg).or_else(|| {
        Desktop::PROBES
            .iter()
            .find(|(binary, _)| executor.which(binary))
            .map(|(_, desktop)| desktop.clone())
    })
}

fn detect_root(executor: &dyn Executor) -> bool {
    executor
        .run_unchecked("id", &["-u"])
        .is_ok_and(|r| r.success && r.stdout.trim() == "0")
}

/// Extract `PRETTY_NAME` (or `NAME`) from `/etc/os-release` content.
#[must_use]
pub fn parse_os_release(text: &str) -> Option<String> {
    let value_of = |key: &str| {
        text.lines().find_map(|line| {
            line.strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|v| v.trim().trim_matches('"').to_string())
        })
    };
    value_of("PRETTY_NAME")
        .or_else(|| value_of("NAME"))
        .filter(|v| !v.is_empty())
}
