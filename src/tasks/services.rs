//! Task: restart services queued by earlier tasks.
use anyhow::Result;

use super::{Context, Task, TaskResult, task_deps};
use crate::resources::Applicable as _;
use crate::resources::system::ServiceRestartResource;

/// Restart the services whose settings changed during this run.
#[derive(Debug)]
pub struct RestartServices;

impl Task for RestartServices {
    fn name(&self) -> &'static str {
        "Restart services"
    }

    task_deps![super::settings::ApplyFileSettings];

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.settings.iter().any(|s| s.restart.is_some())
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let services = ctx.take_restarts();
        if services.is_empty() {
            ctx.log.info("no settings changed, nothing to restart");
            return Ok(TaskResult::Ok);
        }

        if ctx.dry_run {
            for service in &services {
                ctx.log.dry_run(&format!("would restart {service}"));
            }
            return Ok(TaskResult::DryRun);
        }

        if !ctx.executor.which("systemctl") {
            return Ok(TaskResult::Skipped(format!(
                "systemctl not found, restart manually: {}",
                services.join(", ")
            )));
        }

        let mut failed = Vec::new();
        for service in services {
            let resource = ServiceRestartResource::new(service, ctx.sudo(), &*ctx.executor);
            match resource.apply() {
                Ok(_) => ctx.log.info(&resource.description()),
                Err(e) => {
                    ctx.log
                        .warn(&format!("failed to {}: {e:#}", resource.description()));
                    failed.push(resource.service);
                }
            }
        }

        if !failed.is_empty() {
            anyhow::bail!("failed to restart: {}", failed.join(", "));
        }
        Ok(TaskResult::Ok)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exec::Executor;
    use crate::resources::test_helpers::ProgramsExecutor;
    use crate::tasks::test_helpers::make_context_with;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn context(executor: &Arc<ProgramsExecutor>) -> Context {
        let shared: Arc<dyn Executor> = Arc::<ProgramsExecutor>::clone(executor);
        make_context_with(Config::empty(PathBuf::from("/tmp")), shared)
    }

    #[test]
    fn restarts_queued_services_in_order() {
        let executor = Arc::new(ProgramsExecutor::new(&["systemctl"]));
        let ctx = context(&executor);
        ctx.queue_restart("ssh");
        ctx.queue_restart("cron");
        ctx.queue_restart("ssh");

        let result = RestartServices.run(&ctx).unwrap();
        assert!(matches!(result, TaskResult::Ok));
        assert_eq!(
            executor.calls(),
            vec!["systemctl restart cron", "systemctl restart ssh"]
        );
    }

    #[test]
    fn empty_queue_runs_nothing() {
        let executor = Arc::new(ProgramsExecutor::new(&["systemctl"]));
        let ctx = context(&executor);
        assert!(matches!(RestartServices.run(&ctx).unwrap(), TaskResult::Ok));
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn failed_restart_fails_the_task() {
        let executor = Arc::new(ProgramsExecutor::new(&["systemctl"]).failing("restart ssh"));
        let ctx = context(&executor);
        ctx.queue_restart("ssh");
        ctx.queue_restart("cron");

        let err = RestartServices.run(&ctx).unwrap_err();
        assert_eq!(err.to_string(), "failed to restart: ssh");
        assert_eq!(executor.calls().len(), 2);
    }

    #[test]
    fn dry_run_only_reports() {
        let executor = Arc::new(ProgramsExecutor::new(&["systemctl"]));
        let mut ctx = context(&executor);
        ctx.dry_run = true;
        ctx.queue_restart("ssh");

        assert!(matches!(RestartServices.run(&ctx).unwrap(), TaskResult::DryRun));
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn settings_then_restart_end_to_end() {
        use crate::config::settings::FileSetting;
        use crate::tasks::settings::ApplyFileSettings;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sshd_config");
        std::fs::write(&file, "PermitRootLogin yes\n").unwrap();
        let mut config = Config::empty(dir.path().to_path_buf());
        config.settings = vec![FileSetting {
            file: file.clone(),
            key: "PermitRootLogin".to_string(),
            value: "no".to_string(),
            separator: " ".to_string(),
            restart: Some("ssh".to_string()),
        }];
        let executor = Arc::new(ProgramsExecutor::new(&["systemctl"]));
        let shared: Arc<dyn Executor> = Arc::<ProgramsExecutor>::clone(&executor);
        let ctx = make_context_with(config, shared);

        assert!(RestartServices.should_run(&ctx));
        ApplyFileSettings.run(&ctx).unwrap();
        RestartServices.run(&ctx).unwrap();
        assert_eq!(executor.calls(), vec!["systemctl restart ssh"]);
    }
}
