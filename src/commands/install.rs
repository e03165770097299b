//! Command: run the install task graph.
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Result;

use super::{CommandSetup, run_tasks_to_completion};
use crate::cli::{GlobalOpts, InstallOpts};
use crate::logging::{Log, Logger};
use crate::tasks::{self, Task};

/// Run the install command.
///
/// # Errors
///
/// Returns an error if configuration loading fails or any task fails.
pub fn run(
    global: &GlobalOpts,
    opts: &InstallOpts,
    log: &Arc<Logger>,
    interrupted: Arc<AtomicBool>,
) -> Result<()> {
    log.info(&format!("syskit {}", super::version()));

    let setup = CommandSetup::init(global, log)?;
    let shared: Arc<dyn Log> = Arc::<Logger>::clone(log);
    let ctx = setup.into_context(global, shared, interrupted)?;

    let all_tasks = tasks::all_install_tasks();
    let selected = select_tasks(&all_tasks, opts);
    log.debug(&format!(
        "{} of {} tasks selected",
        selected.len(),
        all_tasks.len()
    ));

    run_tasks_to_completion(&selected, &ctx, log)
}

/// Apply `--only` / `--skip` (case-insensitive substrings of task names).
///
/// `--only` takes precedence when both are given.
#[must_use]
pub fn select_tasks<'a>(all: &'a [Box<dyn Task>], opts: &InstallOpts) -> Vec<&'a dyn Task> {
    all.iter()
        .filter(|t| {
            let name = t.name().to_lowercase();
            if !opts.only.is_empty() {
                return opts.only.iter().any(|o| name.contains(&o.to_lowercase()));
            }
            if !opts.skip.is_empty() {
                return !opts.skip.iter().any(|s| name.contains(&s.to_lowercase()));
            }
            true
        })
        .map(AsRef::as_ref)
        .collect()
}
