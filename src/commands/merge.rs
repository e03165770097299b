//! Command: merge one configuration block into a file.
use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, MergeOpts};
use crate::logging::Log;
use crate::resources::config_block::ConfigBlockResource;

/// Run the merge command.
///
/// # Errors
///
/// Returns an error if the source cannot be read or the target cannot be
/// read or written.
pub fn run(global: &GlobalOpts, opts: &MergeOpts, log: &dyn Log) -> Result<()> {
    let block = std::fs::read_to_string(&opts.source)
        .with_context(|| format!("reading block {}", opts.source.display()))?;
    let resource = ConfigBlockResource::new(opts.target.clone(), block, opts.clean, global.backup);

    log.stage(&format!(
        "Merging {} into {}",
        opts.source.display(),
        opts.target.display()
    ));
    merge_block(&resource, global.dry_run, log)?;
    Ok(())
}

/// Merge one block, logging every added and skipped entry.
///
/// Returns whether the target changed (or would change in dry-run mode).
///
/// # Errors
///
/// Returns an error if the target cannot be read or written.
pub fn merge_block(resource: &ConfigBlockResource, dry_run: bool, log: &dyn Log) -> Result<bool> {
    let (existing, outcome) = resource.plan()?;

    if outcome.cleaned {
        log.info("removed previous managed section");
    }
    for entry in &outcome.added {
        log.info(&format!("+ {}", entry.head()));
    }
    for (entry, reason) in outcome.skipped_entries() {
        log.debug(&format!("= {} ({reason:?})", entry.head()));
    }

    let changed = outcome.changes(&existing) || !resource.target.exists();
    if !changed {
        log.info(&format!("{} already up to date", resource.target.display()));
        return Ok(false);
    }

    if dry_run {
        log.dry_run(&format!(
            "would append {} entries to {}",
            outcome.added.len(),
            resource.target.display()
        ));
        return Ok(true);
    }

    if let Some(backup) = resource.write(&outcome)? {
        log.info(&format!("backup: {}", backup.display()));
    }
    log.info(&format!(
        "merged {} entries into {}",
        outcome.added.len(),
        resource.target.display()
    ));
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::Logger;
    use std::path::Path;

    const BLOCK: &str = "# syskit aliases\nalias ll='ls -l'\nalias gs='git status'\n";

    fn global(dry_run: bool) -> GlobalOpts {
        GlobalOpts {
            dry_run,
            root: None,
            parallel: false,
            backup: false,
        }
    }

    fn opts(dir: &Path, clean: bool) -> MergeOpts {
        std::fs::write(dir.join("aliases"), BLOCK).unwrap();
        MergeOpts {
            source: dir.join("aliases"),
            target: dir.join(".bash_aliases"),
            clean,
        }
    }

    #[test]
    fn creates_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let log = Logger::with_log_file(None);
        let opts = opts(dir.path(), false);

        run(&global(false), &opts, &log).unwrap();
        assert_eq!(std::fs::read_to_string(&opts.target).unwrap(), BLOCK);
    }

    #[test]
    fn keeps_user_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let log = Logger::with_log_file(None);
        let opts = opts(dir.path(), false);
        std::fs::write(&opts.target, "alias ll='ls -lah'\n").unwrap();

        run(&global(false), &opts, &log).unwrap();
        assert_eq!(
            std::fs::read_to_string(&opts.target).unwrap(),
            "alias ll='ls -lah'\n\n# syskit aliases\nalias gs='git status'\n"
        );
    }

    #[test]
    fn reports_unchanged_target() {
        let dir = tempfile::tempdir().unwrap();
        let log = Logger::with_log_file(None);
        let opts = opts(dir.path(), false);
        std::fs::write(&opts.target, BLOCK).unwrap();
        let resource = ConfigBlockResource::new(opts.target.clone(), BLOCK.to_string(), false, false);

        assert!(!merge_block(&resource, false, &log).unwrap());
        assert_eq!(std::fs::read_to_string(&opts.target).unwrap(), BLOCK);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = Logger::with_log_file(None);
        let opts = opts(dir.path(), false);
        let resource = ConfigBlockResource::new(opts.target.clone(), BLOCK.to_string(), false, false);

        assert!(merge_block(&resource, true, &log).unwrap());
        assert!(!opts.target.exists());
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = Logger::with_log_file(None);
        let opts = MergeOpts {
            source: dir.path().join("absent"),
            target: dir.path().join("target"),
            clean: false,
        };

        let err = run(&global(false), &opts, &log).unwrap_err();
        assert!(format!("{err:#}").contains("reading block"), "{err:#}");
    }
}
