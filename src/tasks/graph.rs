//! Task dependency graph utilities.

use std::any::TypeId;
use std::collections::HashMap;

use super::Task;
use crate::error::TaskError;

/// Stable topological order of `tasks`, as indices into the slice.
///
/// Among tasks whose dependencies are satisfied, the one listed first runs
/// first, so a list already in dependency order is returned unchanged.
/// Dependencies on tasks absent from the slice (filtered out by `--only` or
/// `--skip`) are ignored.
///
/// # Errors
///
/// Returns [`TaskError::DependencyCycle`] naming the tasks left unordered.
pub fn execution_order(tasks: &[&dyn Task]) -> Result<Vec<usize>, TaskError> {
    let type_to_idx: HashMap<TypeId, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.task_id(), i))
        .collect();

    let deps: Vec<Vec<usize>> = tasks
        .iter()
        .map(|t| {
            t.dependencies()
                .iter()
                .filter_map(|d| type_to_idx.get(d).copied())
                .collect()
        })
        .collect();

    let mut done = vec![false; tasks.len()];
    let mut order = Vec::with_capacity(tasks.len());

    while order.len() < tasks.len() {
        let ready = (0..tasks.len()).find(|&i| {
            !done.get(i).copied().unwrap_or(true)
                && deps
                    .get(i)
                    .is_some_and(|d| d.iter().all(|&j| done.get(j).copied().unwrap_or(false)))
        });
        let Some(next) = ready else {
            let stuck: Vec<&str> = tasks
                .iter()
                .zip(&done)
                .filter(|&(_, &d)| !d)
                .map(|(t, _)| t.name())
                .collect();
            return Err(TaskError::DependencyCycle(stuck.join(" -> ")));
        };
        if let Some(slot) = done.get_mut(next) {
            *slot = true;
        }
        order.push(next);
    }

    Ok(order)
}
