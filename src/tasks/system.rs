//! Task: timezone and sleep configuration.
use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources};
use crate::resources::system::{SleepTargetResource, TimezoneResource};

/// Set the timezone and mask sleep targets through systemd.
#[derive(Debug)]
pub struct ConfigureSystem;

impl ConfigureSystem {
    fn timezone(ctx: &Context, timezone: &str) -> Result<Option<TaskResult>> {
        if !ctx.executor.which("timedatectl") {
            ctx.log.warn("timedatectl not found, timezone left unchanged");
            return Ok(None);
        }
        let resource = TimezoneResource::new(timezone.to_string(), ctx.sudo(), &*ctx.executor);
        process_resources(ctx, [resource], &ProcessOpts::apply_all("set")).map(Some)
    }

    fn sleep_targets(ctx: &Context) -> Result<Option<TaskResult>> {
        if !ctx.executor.which("systemctl") {
            ctx.log.warn("systemctl not found, sleep targets left unchanged");
            return Ok(None);
        }
        let resources = SleepTargetResource::all(ctx.sudo(), &*ctx.executor);
        process_resources(ctx, resources, &ProcessOpts::apply_all("mask").no_bail()).map(Some)
    }
}

impl Task for ConfigureSystem {
    fn name(&self) -> &'static str {
        "Configure system"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.system.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        ctx.platform.require_linux()?;
        let system = &ctx.config.system;

        let mut results = Vec::new();
        if let Some(timezone) = &system.timezone {
            results.extend(Self::timezone(ctx, timezone)?);
        }
        if system.disable_sleep {
            results.extend(Self::sleep_targets(ctx)?);
        }

        if results.is_empty() {
            return Ok(TaskResult::Skipped("systemd tools not found".to_string()));
        }
        Ok(if ctx.dry_run {
            TaskResult::DryRun
        } else {
            TaskResult::Ok
        })
    }
}
