//! Task: add `nofail` to optional fstab mounts.
use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources};
use crate::resources::fstab::FstabNofailResource;

/// Add `nofail` to optional fstab mounts so a missing disk cannot block boot.
#[derive(Debug)]
pub struct HardenFstab;

impl Task for HardenFstab {
    fn name(&self) -> &'static str {
        "Harden fstab"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.system.fstab_nofail
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let sudo = ctx.sudo().then_some(&*ctx.executor);
        let resource =
            FstabNofailResource::new(ctx.config.system.fstab.clone(), ctx.backup).with_sudo(sudo);
        process_resources(ctx, [resource], &ProcessOpts::apply_all("set"))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::platform::Platform;
    use crate::resources::package::PackageManager;
    use crate::resources::test_helpers::ProgramsExecutor;
    use crate::tasks::test_helpers::{make_context, make_context_with};
    use std::path::Path;
    use std::sync::Arc;

    const FSTAB: &str = "\
# <file system> <mount point> <type> <options> <dump> <pass>
UUID=aaaa  /          ext4  errors=remount-ro  0 1
UUID=bbbb  /data      ext4  defaults           0 2
none       swap       swap  sw                 0 0
";

    fn config(fstab: &Path, enabled: bool) -> Config {
        let mut config = Config::empty(fstab.parent().unwrap().to_path_buf());
        config.system.fstab_nofail = enabled;
        config.system.fstab = fstab.to_path_buf();
        config
    }

    fn context(fstab: &Path, enabled: bool) -> Context {
        make_context(config(fstab, enabled))
    }

    #[test]
    fn runs_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let fstab = dir.path().join("fstab");
        assert!(HardenFstab.should_run(&context(&fstab, true)));
        assert!(!HardenFstab.should_run(&context(&fstab, false)));
    }

    #[test]
    fn adds_nofail_to_data_mount_only() {
        let dir = tempfile::tempdir().unwrap();
        let fstab = dir.path().join("fstab");
        std::fs::write(&fstab, FSTAB).unwrap();
        let ctx = context(&fstab, true);

        let result = HardenFstab.run(&ctx).unwrap();
        assert!(matches!(result, TaskResult::Ok));
        let text = std::fs::read_to_string(&fstab).unwrap();
        assert!(text.contains("/data      ext4  defaults,nofail           0 2"));
        assert!(text.contains("errors=remount-ro  0 1"));
        assert!(text.contains("swap  sw                 0 0"));
    }

    #[test]
    fn dry_run_leaves_fstab_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let fstab = dir.path().join("fstab");
        std::fs::write(&fstab, FSTAB).unwrap();
        let mut ctx = context(&fstab, true);
        ctx.dry_run = true;

        let result = HardenFstab.run(&ctx).unwrap();
        assert!(matches!(result, TaskResult::DryRun));
        assert_eq!(std::fs::read_to_string(&fstab).unwrap(), FSTAB);
    }

    #[test]
    fn non_root_writes_through_sudo() {
        let dir = tempfile::tempdir().unwrap();
        let fstab = dir.path().join("fstab");
        std::fs::write(&fstab, FSTAB).unwrap();
        let executor = Arc::new(ProgramsExecutor::new(&["sudo"]));
        let mut ctx = make_context_with(
            config(&fstab, true),
            Arc::<ProgramsExecutor>::clone(&executor),
        );
        ctx.platform = Arc::new(Platform::new(Some(PackageManager::Apt), false));

        let result = HardenFstab.run(&ctx).unwrap();
        assert!(matches!(result, TaskResult::Ok));
        let calls = executor.calls();
        assert_eq!(calls.len(), 1, "{calls:?}");
        assert!(calls[0].starts_with("sudo cp "), "{}", calls[0]);
        assert!(calls[0].ends_with(&format!(" {}", fstab.display())), "{}", calls[0]);
    }
}
