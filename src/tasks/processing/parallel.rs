//! Rayon-based parallel resource processing.

use std::sync::Mutex;

use anyhow::Result;

use super::apply::process_single;
use super::{ProcessOpts, TaskResult, TaskStats};
use crate::resources::{Resource, ResourceState};
use crate::tasks::Context;

/// Process resources in parallel using Rayon.
pub(super) fn process_resources_parallel<R: Resource + Send>(
    ctx: &Context,
    resources: Vec<R>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    run_parallel(ctx, resources, opts, |resource| {
        let state = resource.current_state()?;
        Ok((resource, state))
    })
}

/// Process resources with pre-computed states in parallel using Rayon.
pub(super) fn process_resource_states_parallel<R: Resource + Send>(
    ctx: &Context,
    resource_states: Vec<(R, ResourceState)>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    run_parallel(ctx, resource_states, opts, Ok)
}

/// Accumulate per-item [`TaskStats`] deltas in parallel using Rayon.
///
/// Items not yet started when Ctrl-C is pressed are left alone.
fn collect_parallel_stats<T: Send>(
    ctx: &Context,
    items: Vec<T>,
    work: impl Fn(T) -> Result<TaskStats> + Sync + Send,
) -> Result<TaskStats> {
    use rayon::prelude::*;
    let stats = Mutex::new(TaskStats::new());
    items.into_par_iter().try_for_each(|item| -> Result<()> {
        if ctx.is_interrupted() {
            return Ok(());
        }
        let delta = work(item)?;
        *stats
            .lock()
            .map_err(|e| anyhow::anyhow!("stats mutex poisoned: {e}"))? += delta;
        Ok(())
    })?;
    Ok(stats
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner))
}

/// The per-item work runs without the stats lock held; the lock is taken
/// only for the counter update.
fn run_parallel<T: Send, R: Resource + Send>(
    ctx: &Context,
    items: Vec<T>,
    opts: &ProcessOpts,
    get_resource_state: impl Fn(T) -> Result<(R, ResourceState)> + Sync,
) -> Result<TaskResult> {
    let stats = collect_parallel_stats(ctx, items, |item| {
        let (resource, current) = get_resource_state(item)?;
        process_single(ctx, &resource, current, opts)
    })?;
    Ok(stats.finish(ctx))
}
