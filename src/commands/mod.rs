//! Command entry points and the setup they share.
pub mod detect;
pub mod install;
pub mod merge;
pub mod packages;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::config::validation::validate_all;
use crate::error::{ConfigError, TaskError};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger, TaskStatus};
use crate::platform::Platform;
use crate::tasks::{self, Context, Task, graph};

/// Environment variable naming the repository root.
pub const ROOT_ENV: &str = "SYSKIT_ROOT";

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection, root resolution and configuration
/// loading so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected platform.
    pub platform: Platform,
    /// Loaded configuration.
    pub config: Config,
}

impl CommandSetup {
    /// Detect the platform, resolve the root, and load all configuration.
    ///
    /// Validation warnings are logged; they never abort the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be determined, HOME is
    /// unset, or any configuration file fails to parse.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let platform = Platform::detect(&SystemExecutor);
        let root = resolve_root(global.root.as_deref(), std::env::var(ROOT_ENV).ok())?;
        let home = home_dir()?;
        if platform.is_root
            && let Ok(user) = std::env::var("SUDO_USER")
        {
            log.warn(&format!(
                "started through sudo by {user}: blocks merge into {}; run as {user} to target their home",
                home.display()
            ));
        }

        log.stage("Loading configuration");
        log.debug(&format!("root: {}", root.display()));
        let config = Config::load(&root, &home)?;

        log.debug(&format!("{} package groups", config.packages.groups.len()));
        log.debug(&format!("{} settings", config.settings.len()));
        log.debug(&format!("{} release binaries", config.releases.len()));
        log.info(&format!(
            "loaded {} packages, {} blocks",
            config.packages.install_names().len(),
            config.blocks.len()
        ));

        let warnings = validate_all(&config);
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!(
                    "  {} [{}]: {}",
                    warning.source, warning.item, warning.message
                ));
            }
        }

        Ok(Self { platform, config })
    }

    /// Build the task context for this run.
    ///
    /// # Errors
    ///
    /// Returns an error if HOME is not set.
    pub fn into_context(
        self,
        global: &GlobalOpts,
        log: Arc<dyn Log>,
        interrupted: Arc<AtomicBool>,
    ) -> Result<Context> {
        let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
        let mut ctx = Context::new(
            Arc::new(self.config),
            Arc::new(self.platform),
            log,
            global.dry_run,
            executor,
            global.parallel,
        )?;
        ctx.backup = global.backup;
        ctx.interrupted = interrupted;
        Ok(ctx)
    }
}

/// Version string baked in at build time, falling back to the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("SYSKIT_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// The user's home directory from `HOME`.
///
/// # Errors
///
/// Returns an error if HOME is not set.
pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("HOME environment variable is not set"))
}

/// Resolve the repository root.
///
/// Tries, in order: the explicit `--root`, the `SYSKIT_ROOT` value,
/// directories relative to the running binary, and the current directory.
/// Only the explicit root and the environment value are accepted without a
/// `conf/` directory check.
///
/// # Errors
///
/// Returns [`ConfigError::RootNotFound`] if no candidate qualifies.
pub fn resolve_root(explicit: Option<&Path>, env_root: Option<String>) -> Result<PathBuf> {
    if let Some(root) = explicit {
        return canonical(root);
    }

    if let Some(root) = env_root.filter(|r| !r.is_empty()) {
        return canonical(Path::new(&root));
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        let candidates = [
            parent.join("../.."), // target/release/ → repo root
            parent.join(".."),    // bin/ → repo root
        ];
        for candidate in &candidates {
            if candidate.join("conf").is_dir() {
                return canonical(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    if cwd.join("conf").is_dir() {
        return Ok(cwd);
    }

    Err(ConfigError::RootNotFound(format!(
        "binary location, {} (use --root or set {ROOT_ENV})",
        cwd.display()
    ))
    .into())
}

fn canonical(path: &Path) -> Result<PathBuf> {
    dunce::canonicalize(path).map_err(|e| {
        ConfigError::RootNotFound(format!("{}: {e}", path.display())).into()
    })
}

/// Execute every task in dependency order, print the summary, and bail if
/// any task failed or the run was interrupted.
///
/// Tasks left after a Ctrl-C are recorded as skipped.
///
/// # Errors
///
/// Returns an error on a dependency cycle, an interrupt, or if one or more
/// tasks recorded a failure.
pub fn run_tasks_to_completion(tasks: &[&dyn Task], ctx: &Context, log: &Logger) -> Result<()> {
    let order = graph::execution_order(tasks)?;
    let total = order.len();
    let mut completed = 0;

    for task in order.iter().filter_map(|&i| tasks.get(i)) {
        if ctx.is_interrupted() {
            log.record_task(task.name(), TaskStatus::Skipped, Some("interrupted"));
            continue;
        }
        tasks::execute(*task, ctx);
        completed += 1;
    }

    log.print_summary();

    if ctx.is_interrupted() {
        return Err(TaskError::Interrupted { completed, total }.into());
    }
    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    Ok(())
}
