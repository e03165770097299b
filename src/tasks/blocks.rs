//! Task: merge configuration blocks into dotfiles.
use anyhow::{Context as _, Result};

use super::{Context, ProcessOpts, Task, TaskResult, process_resources, task_deps};
use crate::resources::config_block::ConfigBlockResource;

/// Merge each configured block into its target dotfile.
#[derive(Debug)]
pub struct MergeConfigBlocks;

impl Task for MergeConfigBlocks {
    fn name(&self) -> &'static str {
        "Merge configuration blocks"
    }

    task_deps![
        super::packages::InstallPackages,
        super::releases::InstallReleases,
    ];

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.blocks.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let mut resources = Vec::with_capacity(ctx.config.blocks.len());
        for block in &ctx.config.blocks {
            let text = std::fs::read_to_string(&block.source)
                .with_context(|| format!("reading block {}", block.source.display()))?;
            ctx.log.debug(&format!(
                "block {}: {} -> {}",
                block.name,
                block.source.display(),
                block.target.display()
            ));
            resources.push(ConfigBlockResource::new(
                block.target.clone(),
                text,
                block.clean,
                ctx.backup,
            ));
        }

        // Two blocks may share a target, so never merge concurrently.
        process_resources(ctx, resources, &ProcessOpts::apply_all("merge").sequential())
    }
}
