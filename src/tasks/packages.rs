//! Task: install the package catalog.
use std::collections::HashSet;

use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, TaskStats, process_resource_states};
use crate::resources::Applicable as _;
use crate::resources::package::{
    PackageManager, PackageResource, batch_install, get_installed_packages, refresh_index,
};

/// Outcome of installing a list of packages.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Packages installed successfully.
    pub installed: Vec<String>,
    /// Packages that failed, with the error.
    pub failed: Vec<(String, String)>,
}

/// Install `names` with one batch command, falling back to one command per
/// package when the batch fails.
///
/// The package index is refreshed first; a failed refresh is only a warning.
#[must_use]
pub fn install_packages(ctx: &Context, manager: PackageManager, names: &[String]) -> InstallReport {
    let mut report = InstallReport::default();
    if names.is_empty() {
        return report;
    }

    let sudo = ctx.sudo();
    if let Err(e) = refresh_index(manager, sudo, &*ctx.executor) {
        ctx.log
            .warn(&format!("failed to refresh {manager} package index: {e:#}"));
    }

    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    ctx.log.debug(&format!(
        "installing {} packages in one batch: {}",
        refs.len(),
        refs.join(" ")
    ));
    match batch_install(manager, &refs, sudo, &*ctx.executor) {
        Ok(()) => {
            for name in names {
                ctx.log.info(&format!("install: {name} ({manager})"));
            }
            report.installed = names.to_vec();
            return report;
        }
        Err(e) => {
            ctx.log.warn(&format!(
                "batch install failed, retrying one package at a time: {e:#}"
            ));
        }
    }

    for name in names {
        if ctx.is_interrupted() {
            break;
        }
        let resource = PackageResource::new(name.clone(), manager, sudo, &*ctx.executor);
        match resource.apply() {
            Ok(_) => {
                ctx.log.info(&format!("install: {}", resource.description()));
                report.installed.push(name.clone());
            }
            Err(e) => {
                ctx.log
                    .warn(&format!("failed to install {}: {e:#}", resource.description()));
                report.failed.push((name.clone(), format!("{e:#}")));
            }
        }
    }
    report
}

/// Install the catalog groups marked `install = true`.
#[derive(Debug)]
pub struct InstallPackages;

impl Task for InstallPackages {
    fn name(&self) -> &'static str {
        "Install packages"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.packages.install_names().is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let manager = ctx.platform.require_package_manager()?;
        let names = ctx.config.packages.install_names();

        ctx.log.debug(&format!(
            "batch-checking {} packages with a single query",
            names.len()
        ));
        let installed: HashSet<String> = get_installed_packages(manager, &*ctx.executor)?;
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !installed.contains(*name))
            .cloned()
            .collect();

        if ctx.dry_run {
            let sudo = ctx.sudo();
            let states = names.iter().map(|name| {
                let resource = PackageResource::new(name.clone(), manager, sudo, &*ctx.executor);
                let state = resource.state_from_installed(&installed);
                (resource, state)
            });
            return process_resource_states(ctx, states, &ProcessOpts::install_missing("install"));
        }

        let mut stats = TaskStats::new();
        stats.already_ok = u32::try_from(names.len() - missing.len()).unwrap_or(u32::MAX);
        let report = install_packages(ctx, manager, &missing);
        stats.changed = u32::try_from(report.installed.len()).unwrap_or(u32::MAX);
        stats.skipped = u32::try_from(report.failed.len()).unwrap_or(u32::MAX);
        Ok(stats.finish(ctx))
    }
}
