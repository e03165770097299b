//! Task: install binaries from GitHub releases.
use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources, task_deps};
use crate::resources::release::ReleaseResource;

/// Install binaries from the latest GitHub release of each configured repo.
#[derive(Debug)]
pub struct InstallReleases;

impl Task for InstallReleases {
    fn name(&self) -> &'static str {
        "Install release binaries"
    }

    task_deps![super::packages::InstallPackages];

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.releases.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let resources = ctx.config.releases.iter().map(|release| {
            ReleaseResource::new(
                release.repo.clone(),
                release.asset.clone(),
                release.binary.clone(),
                release.install_dir.clone(),
                release.link_dir.clone(),
                &*ctx.releases,
                &*ctx.executor,
            )
        });
        process_resources(ctx, resources, &ProcessOpts::apply_all("install").no_bail())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::config::releases::ReleaseBinary;
    use crate::resources::release::ReleaseSource;
    use crate::resources::release::test_helpers::FakeReleaseSource;
    use crate::tasks::test_helpers::make_context;
    use std::path::Path;
    use std::sync::Arc;

    fn shared(source: &Arc<FakeReleaseSource>) -> Arc<dyn ReleaseSource> {
        Arc::<FakeReleaseSource>::clone(source)
    }

    fn config(bin_dir: &Path) -> Config {
        let mut config = Config::empty(bin_dir.to_path_buf());
        config.releases = vec![
            ReleaseBinary {
                repo: "owner/tool".to_string(),
                asset: "linux-amd64".to_string(),
                binary: "tool".to_string(),
                install_dir: bin_dir.join("bin"),
                link_dir: None,
            },
            ReleaseBinary {
                repo: "owner/other".to_string(),
                asset: "darwin".to_string(),
                binary: "other".to_string(),
                install_dir: bin_dir.join("bin"),
                link_dir: None,
            },
        ];
        config
    }

    #[test]
    fn installs_matching_asset_and_tolerates_missing_one() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeReleaseSource::new("v2.0.0").asset(
            "tool-linux-amd64",
            b"#!/bin/sh\necho tool\n",
            None,
        ));
        let ctx = make_context(config(dir.path())).with_release_source(shared(&source));

        let result = InstallReleases.run(&ctx).unwrap();
        assert!(matches!(result, TaskResult::Ok));
        assert!(dir.path().join("bin/tool").is_file());
        assert!(!dir.path().join("bin/other").exists());
        assert_eq!(source.downloads(), vec!["tool-linux-amd64"]);
    }

    #[test]
    fn installed_binary_is_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/tool"), "old").unwrap();
        std::fs::write(dir.path().join("bin/other"), "old").unwrap();
        let source = Arc::new(FakeReleaseSource::new("v2.0.0"));
        let ctx = make_context(config(dir.path())).with_release_source(shared(&source));

        InstallReleases.run(&ctx).unwrap();
        assert!(source.downloads().is_empty());
    }

    #[test]
    fn dry_run_downloads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeReleaseSource::new("v2.0.0").asset("tool-linux-amd64", b"x", None));
        let mut ctx =
            make_context(config(dir.path())).with_release_source(shared(&source));
        ctx.dry_run = true;

        let result = InstallReleases.run(&ctx).unwrap();
        assert!(matches!(result, TaskResult::DryRun));
        assert!(source.downloads().is_empty());
        assert!(!dir.path().join("bin").exists());
    }

    #[test]
    fn unreachable_api_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_context(config(dir.path()));
        let result = InstallReleases.run(&ctx).unwrap();
        assert!(matches!(result, TaskResult::Ok));
    }
}
