//! Task: apply `key value` settings to system files.
use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources, task_deps};
use crate::resources::line_setting::LineSettingResource;
use crate::resources::{Applicable, Resource, ResourceChange, ResourceState};

/// A line setting that queues a service restart when it is applied.
#[derive(Debug)]
struct RestartOnChange<'a> {
    setting: LineSettingResource<'a>,
    service: Option<String>,
    ctx: &'a Context,
}

impl Applicable for RestartOnChange<'_> {
    fn description(&self) -> String {
        self.setting.description()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let change = self.setting.apply()?;
        if change == ResourceChange::Applied
            && let Some(service) = &self.service
        {
            self.ctx.queue_restart(service);
        }
        Ok(change)
    }
}

impl Resource for RestartOnChange<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        self.setting.current_state()
    }
}

/// Ensure `key value` lines in system configuration files.
#[derive(Debug)]
pub struct ApplyFileSettings;

impl Task for ApplyFileSettings {
    fn name(&self) -> &'static str {
        "Apply file settings"
    }

    task_deps![super::packages::InstallPackages];

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.settings.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let sudo = ctx.sudo().then_some(&*ctx.executor);
        let resources: Vec<RestartOnChange<'_>> = ctx
            .config
            .settings
            .iter()
            .map(|s| RestartOnChange {
                setting: LineSettingResource::new(
                    s.file.clone(),
                    s.key.clone(),
                    s.value.clone(),
                    s.separator.clone(),
                    ctx.backup,
                )
                .with_sudo(sudo),
                service: s.restart.clone(),
                ctx,
            })
            .collect();

        if ctx.dry_run {
            for resource in &resources {
                if let Some(service) = &resource.service
                    && resource.needs_change()?
                {
                    ctx.queue_restart(service);
                }
            }
        }

        // Several settings usually share one file.
        process_resources(
            ctx,
            resources,
            &ProcessOpts::apply_all("set").no_bail().sequential(),
        )
    }
}
