//! Commands: package catalog status and ad-hoc installs.
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use rayon::prelude::*;

use super::CommandSetup;
use crate::cli::{GlobalOpts, PackageInstallOpts, StatusOpts};
use crate::config::packages::{PackageCatalog, PackageGroup};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger, terminal_columns, truncate_to_width};
use crate::resources::package::{PackageManager, PackageResource, get_installed_packages};
use crate::tasks::packages::install_packages;

/// Run `packages status`.
///
/// # Errors
///
/// Returns an error if configuration fails to load, no package manager is
/// available, the installed-package query fails, or `--group` names an
/// unknown group.
pub fn status(global: &GlobalOpts, opts: &StatusOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let manager = setup.platform.require_package_manager()?;
    let executor = SystemExecutor;
    let installed = get_installed_packages(manager, &executor)?;

    let groups = select_groups(&setup.config.packages, opts.group.as_deref())?;
    let columns = terminal_columns();
    for group in groups {
        for line in group_lines(group, &installed, manager, &executor, columns) {
            log.info(&line);
        }
    }
    Ok(())
}

/// Run `packages install`.
///
/// # Errors
///
/// Returns an error if no package manager is available or any package
/// fails to install.
pub fn install(
    global: &GlobalOpts,
    opts: &PackageInstallOpts,
    log: &Arc<Logger>,
    interrupted: Arc<AtomicBool>,
) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let manager = setup.platform.require_package_manager()?;
    let shared: Arc<dyn Log> = Arc::<Logger>::clone(log);
    let ctx = setup.into_context(global, shared, interrupted)?;

    log.stage(&format!("Installing {} package(s)", opts.names.len()));
    if ctx.dry_run {
        for name in &opts.names {
            log.dry_run(&format!("would install: {name} ({manager})"));
        }
        return Ok(());
    }

    let report = install_packages(&ctx, manager, &opts.names);
    for name in &report.installed {
        log.info(&format!("ok: {name}"));
    }
    for (name, error) in &report.failed {
        log.error(&format!("failed: {name}: {error}"));
    }
    if !report.failed.is_empty() {
        let names: Vec<&str> = report.failed.iter().map(|(n, _)| n.as_str()).collect();
        anyhow::bail!(
            "{} package(s) failed to install: {}",
            names.len(),
            names.join(", ")
        );
    }
    Ok(())
}

/// Groups to display: all of them, or the one named by `--group`.
///
/// # Errors
///
/// Returns an error if `name` matches no group.
pub fn select_groups<'a>(
    catalog: &'a PackageCatalog,
    name: Option<&str>,
) -> Result<Vec<&'a PackageGroup>> {
    let Some(name) = name else {
        return Ok(catalog.groups.iter().collect());
    };
    catalog.group(name).map(|g| vec![g]).ok_or_else(|| {
        let known: Vec<&str> = catalog.groups.iter().map(|g| g.name.as_str()).collect();
        anyhow::anyhow!("unknown package group '{name}' (known: {})", known.join(", "))
    })
}

/// Render one group: a `--- NAME ---` header followed by one line per package.
///
/// Availability queries run in parallel; output keeps catalog order.
#[must_use]
pub fn group_lines(
    group: &PackageGroup,
    installed: &HashSet<String>,
    manager: PackageManager,
    executor: &dyn Executor,
    columns: usize,
) -> Vec<String> {
    let statuses: Vec<_> = group
        .packages
        .par_iter()
        .map(|pkg| {
            PackageResource::new(pkg.name().to_string(), manager, false, executor).status(installed)
        })
        .collect();

    let name_width = group
        .packages
        .iter()
        .map(|p| p.name().len())
        .max()
        .unwrap_or(0);

    let mut lines = Vec::with_capacity(group.packages.len() + 1);
    lines.push(format!("--- {} ---", group.name.to_uppercase()));
    for (pkg, status) in group.packages.iter().zip(&statuses) {
        let head = format!("  {:<name_width$}  {:<12}", pkg.name(), status.label());
        let line = match pkg.description() {
            Some(desc) => {
                let room = columns.saturating_sub(head.chars().count() + 2);
                format!("{head}  {}", truncate_to_width(desc, room))
            }
            None => head.trim_end().to_string(),
        };
        lines.push(line);
    }
    lines
}
