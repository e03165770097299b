//! Shared state handed to every task.
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::config::Config;
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;
use crate::resources::release::{GitHubReleaseSource, ReleaseSource};

/// Shared context for task execution.
pub struct Context {
    /// Configuration loaded from `conf/`.
    pub config: Arc<Config>,
    /// Detected platform information.
    pub platform: Arc<Platform>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// User's home directory path.
    pub home: PathBuf,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Source of GitHub release metadata and assets.
    pub releases: Arc<dyn ReleaseSource>,
    /// Whether to process resources in parallel using Rayon.
    pub parallel: bool,
    /// Whether edited files are backed up first.
    pub backup: bool,
    /// Services to restart once all settings are applied.
    ///
    /// Shared across per-task contexts; drained by the restart task.
    pub restart_queue: Arc<Mutex<BTreeSet<String>>>,
    /// Set by the Ctrl-C handler.
    pub interrupted: Arc<AtomicBool>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &"<Config>")
            .field("platform", &self.platform)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("home", &self.home)
            .field("executor", &"<dyn Executor>")
            .field("releases", &self.releases)
            .field("parallel", &self.parallel)
            .field("backup", &self.backup)
            .field("restart_queue", &self.restart_queue)
            .field("interrupted", &self.interrupted)
            .finish()
    }
}

impl Context {
    /// Creates a new context for task execution.
    ///
    /// # Errors
    ///
    /// Returns an error if the HOME environment variable is not set.
    pub fn new(
        config: Arc<Config>,
        platform: Arc<Platform>,
        log: Arc<dyn Log>,
        dry_run: bool,
        executor: Arc<dyn Executor>,
        parallel: bool,
    ) -> Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?;

        Ok(Self {
            config,
            platform,
            log,
            dry_run,
            home: PathBuf::from(home),
            executor,
            releases: Arc::new(GitHubReleaseSource::default()),
            parallel,
            backup: true,
            restart_queue: Arc::new(Mutex::new(BTreeSet::new())),
            interrupted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Root directory of the configuration repository.
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.config.root
    }

    /// Whether privileged commands need a `sudo` prefix.
    #[must_use]
    pub fn sudo(&self) -> bool {
        self.platform.needs_sudo()
    }

    /// Whether Ctrl-C was pressed.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Queue `service` for a restart at the end of the run.
    pub fn queue_restart(&self, service: &str) {
        self.restart_queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(service.to_string());
    }

    /// Take every queued service, leaving the queue empty.
    #[must_use]
    pub fn take_restarts(&self) -> Vec<String> {
        let mut queue = self
            .restart_queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::mem::take(&mut *queue).into_iter().collect()
    }

    /// Create a copy of this context with a different logger.
    ///
    /// All other fields are cloned by reference (via `Arc`).
    #[must_use]
    pub fn with_log(&self, log: Arc<dyn Log>) -> Self {
        Self {
            config: Arc::clone(&self.config),
            platform: Arc::clone(&self.platform),
            log,
            dry_run: self.dry_run,
            home: self.home.clone(),
            executor: Arc::clone(&self.executor),
            releases: Arc::clone(&self.releases),
            parallel: self.parallel,
            backup: self.backup,
            restart_queue: Arc::clone(&self.restart_queue),
            interrupted: Arc::clone(&self.interrupted),
        }
    }

    /// Create a copy of this context with a different release source.
    #[must_use]
    pub fn with_release_source(&self, releases: Arc<dyn ReleaseSource>) -> Self {
        let mut ctx = self.with_log(Arc::clone(&self.log));
        ctx.releases = releases;
        ctx
    }
}
