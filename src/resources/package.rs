//! Package installation resource.
use std::collections::HashSet;
use std::fmt;

use anyhow::Result;

use super::error::ResourceError;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::{Executor, run_as_root};

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    /// Debian / Ubuntu (`apt-get`, `dpkg-query`).
    Apt,
    /// Fedora (`dnf`, `rpm`).
    Dnf,
    /// Older RHEL / CentOS (`yum`, `rpm`).
    Yum,
    /// Arch Linux (`pacman`).
    Pacman,
    /// openSUSE (`zypper`, `rpm`).
    Zypper,
}

impl PackageManager {
    /// Detection order: the first manager found on PATH wins.
    pub const PROBE_ORDER: [Self; 5] = [Self::Apt, Self::Dnf, Self::Yum, Self::Pacman, Self::Zypper];

    /// Binary whose presence on PATH identifies this manager.
    #[must_use]
    pub const fn probe_binary(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Zypper => "zypper",
        }
    }

    /// Program and leading arguments of the install command.
    const fn install_command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Apt => ("apt-get", &["install", "-y"]),
            Self::Dnf => ("dnf", &["install", "-y"]),
            Self::Yum => ("yum", &["install", "-y"]),
            Self::Pacman => ("pacman", &["-S", "--needed", "--noconfirm"]),
            Self::Zypper => ("zypper", &["--non-interactive", "install"]),
        }
    }

    /// Program and arguments that refresh the package index, if any.
    ///
    /// Pacman has none: `pacman -Sy` without `-u` leaves a partial upgrade.
    const fn refresh_command(self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            Self::Apt => Some(("apt-get", &["update"])),
            Self::Dnf => Some(("dnf", &["makecache"])),
            Self::Yum => Some(("yum", &["makecache"])),
            Self::Zypper => Some(("zypper", &["--non-interactive", "refresh"])),
            Self::Pacman => None,
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apt => write!(f, "apt"),
            Self::Dnf => write!(f, "dnf"),
            Self::Yum => write!(f, "yum"),
            Self::Pacman => write!(f, "pacman"),
            Self::Zypper => write!(f, "zypper"),
        }
    }
}

/// Installation status of a catalog package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStatus {
    /// Already installed.
    Installed,
    /// Not installed but present in the configured repositories.
    Available,
    /// Not installed and unknown to the configured repositories.
    NotAvailable,
    /// The availability query itself failed.
    CheckError(String),
}

impl PackageStatus {
    /// Short label used in status listings.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Available => "available",
            Self::NotAvailable => "not in repos",
            Self::CheckError(_) => "check error",
        }
    }
}

/// A system package resource that can be checked and installed.
#[derive(Debug)]
pub struct PackageResource<'a> {
    /// Package name.
    pub name: String,
    /// Package manager to use.
    pub manager: PackageManager,
    /// Prefix privileged commands with `sudo`.
    sudo: bool,
    /// Executor for running package manager commands.
    executor: &'a dyn Executor,
}

impl<'a> PackageResource<'a> {
    /// Create a new package resource.
    #[must_use]
    pub const fn new(
        name: String,
        manager: PackageManager,
        sudo: bool,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            name,
            manager,
            sudo,
            executor,
        }
    }

    /// Determine the resource state from a pre-fetched set of installed package names.
    ///
    /// This avoids running a per-package query when used with
    /// [`get_installed_packages`].
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.name) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }

    /// Ask the repositories whether this package can be installed.
    #[must_use]
    pub fn availability(&self) -> PackageStatus {
        let name = self.name.as_str();
        let (program, args): (&str, Vec<&str>) = match self.manager {
            PackageManager::Apt => ("apt-cache", vec!["show", name]),
            PackageManager::Dnf => ("dnf", vec!["info", "-q", name]),
            PackageManager::Yum => ("yum", vec!["info", "-q", name]),
            PackageManager::Pacman => ("pacman", vec!["-Si", name]),
            PackageManager::Zypper => ("zypper", vec!["--non-interactive", "info", name]),
        };
        match self.executor.run_unchecked(program, &args) {
            Err(e) => PackageStatus::CheckError(format!("{e:#}")),
            Ok(result) => {
                let found = result.success
                    && !result.stdout.trim().is_empty()
                    && !result.stdout.contains("not found");
                if found {
                    PackageStatus::Available
                } else {
                    PackageStatus::NotAvailable
                }
            }
        }
    }

    /// Full status: installed according to `installed`, else repository availability.
    #[must_use]
    pub fn status(&self, installed: &HashSet<String>) -> PackageStatus {
        if installed.contains(&self.name) {
            PackageStatus::Installed
        } else {
            self.availability()
        }
    }
}

/// Query the full set of installed package names for a given manager.
///
/// This runs a **single** command regardless of how many packages need to
/// be checked.
///
/// # Errors
///
/// Returns an error if the query command cannot be executed.
pub fn get_installed_packages(
    manager: PackageManager,
    executor: &dyn Executor,
) -> Result<HashSet<String>> {
    let mut set = HashSet::new();
    match manager {
        PackageManager::Apt => {
            // One line per known package: "<status> <name>"; only keep installed ones.
            let result = executor.run_unchecked(
                "dpkg-query",
                &["-W", "-f=${db:Status-Status} ${Package}\\n"],
            )?;
            if result.success {
                for line in result.stdout.lines() {
                    if let Some(name) = line.strip_prefix("installed ") {
                        set.insert(name.trim().to_string());
                    }
                }
            }
        }
        PackageManager::Dnf | PackageManager::Yum | PackageManager::Zypper => {
            let result = executor.run_unchecked("rpm", &["-qa", "--qf", "%{NAME}\\n"])?;
            if result.success {
                set.extend(result.stdout.lines().map(|l| l.trim().to_string()));
            }
        }
        PackageManager::Pacman => {
            let result = executor.run_unchecked("pacman", &["-Qq"])?;
            if result.success {
                set.extend(result.stdout.lines().map(|l| l.trim().to_string()));
            }
        }
    }
    set.remove("");
    Ok(set)
}

/// Refresh the package index before installing.
///
/// # Errors
///
/// Returns an error if the refresh command fails.
pub fn refresh_index(manager: PackageManager, sudo: bool, executor: &dyn Executor) -> Result<()> {
    if let Some((program, args)) = manager.refresh_command() {
        run_as_root(executor, sudo, program, args)?;
    }
    Ok(())
}

/// Install `names` in a single package manager invocation.
///
/// # Errors
///
/// Returns [`ResourceError::ExecutionFailed`] if the install command fails.
pub fn batch_install(
    manager: PackageManager,
    names: &[&str],
    sudo: bool,
    executor: &dyn Executor,
) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    let (program, base) = manager.install_command();
    let mut args: Vec<&str> = base.to_vec();
    args.extend_from_slice(names);
    run_as_root(executor, sudo, program, &args).map_err(|e| ResourceError::ExecutionFailed {
        program: program.to_string(),
        exit_code: -1,
        stderr: format!("{e:#}"),
    })?;
    Ok(())
}

impl Applicable for PackageResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.name, self.manager)
    }

    fn apply(&self) -> Result<ResourceChange> {
        batch_install(self.manager, &[self.name.as_str()], self.sudo, self.executor)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for PackageResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let installed = get_installed_packages(self.manager, self.executor)?;
        Ok(self.state_from_installed(&installed))
    }
}
