#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `install` command.
//!
//! These tests check the structure of the task list returned by
//! [`tasks::all_install_tasks`] and run the whole list against a temporary
//! repository with a scripted executor.

mod common;

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{ScriptedExecutor, TestRepo, make_context};
use syskit::cli::InstallOpts;
use syskit::commands::install::select_tasks;
use syskit::commands::run_tasks_to_completion;
use syskit::logging::{Logger, TaskStatus};
use syskit::tasks;

const FSTAB: &str = "\
UUID=aaaa  /      ext4  errors=remount-ro  0 1
UUID=bbbb  /data  ext4  defaults           0 2
";

const BASHRC_BLOCK: &str = "# syskit bashrc\nexport EDITOR=vim\nalias ll='ls -alF'\n";

fn repo() -> TestRepo {
    let repo = TestRepo::new()
        .file("etc/ssh/sshd_config", "#PermitRootLogin prohibit-password\n")
        .file("etc/fstab", FSTAB)
        .file("home/.bashrc", "alias ll='ls -la'\n")
        .block("bashrc", BASHRC_BLOCK)
        .conf(
            "packages.toml",
            "[[group]]\nname = \"Base\"\npackages = [\"git\", \"curl\"]\n\n\
             [[group]]\nname = \"Games\"\ninstall = false\npackages = [\"bsdgames\"]\n",
        )
        .conf(
            "blocks.toml",
            "[[block]]\nname = \"bashrc\"\nsource = \"blocks/bashrc\"\ntarget = \"~/.bashrc\"\n",
        );
    let settings = format!(
        "[[setting]]\nfile = \"{}\"\nkey = \"PermitRootLogin\"\nvalue = \"no\"\nrestart = \"ssh\"\n",
        repo.path("etc/ssh/sshd_config").display()
    );
    let system = format!(
        "fstab_nofail = true\nfstab = \"{}\"\n",
        repo.path("etc/fstab").display()
    );
    repo.conf("settings.toml", &settings)
        .conf("system.toml", &system)
}

fn executor() -> Arc<ScriptedExecutor> {
    Arc::new(ScriptedExecutor::new(&["systemctl"]).output("dpkg-query", "installed git\n"))
}

fn statuses(log: &Logger) -> String {
    log.task_entries()
        .iter()
        .map(|e| format!("{}: {:?}", e.name, e.status))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Structural invariants
// ---------------------------------------------------------------------------

#[test]
fn install_task_names_are_unique() {
    let tasks = tasks::all_install_tasks();
    let mut seen: HashSet<&str> = HashSet::new();
    for task in &tasks {
        assert!(
            seen.insert(task.name()),
            "duplicate install task name: '{}'",
            task.name()
        );
    }
}

#[test]
fn install_task_type_ids_are_unique() {
    let tasks = tasks::all_install_tasks();
    let ids: HashSet<TypeId> = tasks.iter().map(|t| t.task_id()).collect();
    assert_eq!(ids.len(), tasks.len());
}

#[test]
fn install_task_dependencies_are_resolvable() {
    let tasks = tasks::all_install_tasks();
    let present: HashSet<TypeId> = tasks.iter().map(|t| t.task_id()).collect();
    for task in &tasks {
        for dep in task.dependencies() {
            assert!(
                present.contains(dep),
                "task '{}' declares a dependency that is not in the install task list",
                task.name()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Full runs
// ---------------------------------------------------------------------------

#[test]
fn full_install_converges_system() {
    let repo = repo();
    let executor = executor();
    let log = Arc::new(Logger::with_log_file(None));
    let ctx = make_context(&repo, &executor, &log, false);

    let all = tasks::all_install_tasks();
    let selected: Vec<&dyn tasks::Task> = all.iter().map(AsRef::as_ref).collect();
    run_tasks_to_completion(&selected, &ctx, &log).unwrap();

    insta::assert_snapshot!(statuses(&log), @r"
    Install packages: Ok
    Install release binaries: NotApplicable
    Merge configuration blocks: Ok
    Apply file settings: Ok
    Harden fstab: Ok
    Configure system: NotApplicable
    Restart services: Ok
    ");

    let calls = executor.calls();
    assert!(calls.contains(&"apt-get install -y curl".to_string()), "{calls:?}");
    assert!(!calls.iter().any(|c| c.contains("bsdgames")), "{calls:?}");
    assert!(calls.contains(&"systemctl restart ssh".to_string()), "{calls:?}");

    assert_eq!(
        repo.read("home/.bashrc"),
        "alias ll='ls -la'\n\n# syskit bashrc\nexport EDITOR=vim\n"
    );
    assert_eq!(repo.read("etc/ssh/sshd_config"), "PermitRootLogin no\n");
    assert!(repo.read("etc/fstab").contains("defaults,nofail"));
}

#[test]
fn second_install_changes_nothing() {
    let repo = repo();
    let log = Arc::new(Logger::with_log_file(None));
    let ctx = make_context(&repo, &executor(), &log, false);
    let all = tasks::all_install_tasks();
    let selected: Vec<&dyn tasks::Task> = all.iter().map(AsRef::as_ref).collect();
    run_tasks_to_completion(&selected, &ctx, &log).unwrap();

    let bashrc = repo.read("home/.bashrc");
    let fstab = repo.read("etc/fstab");

    let executor = Arc::new(
        ScriptedExecutor::new(&["systemctl"]).output("dpkg-query", "installed git\ninstalled curl\n"),
    );
    let log = Arc::new(Logger::with_log_file(None));
    let ctx = make_context(&repo, &executor, &log, false);
    run_tasks_to_completion(&selected, &ctx, &log).unwrap();

    assert_eq!(repo.read("home/.bashrc"), bashrc);
    assert_eq!(repo.read("etc/fstab"), fstab);
    assert!(!executor.calls().iter().any(|c| c.starts_with("apt-get")));
    assert!(!executor.calls().iter().any(|c| c.starts_with("systemctl restart")));
}

#[test]
fn dry_run_touches_nothing() {
    let repo = repo();
    let executor = executor();
    let log = Arc::new(Logger::with_log_file(None));
    let ctx = make_context(&repo, &executor, &log, true);

    let all = tasks::all_install_tasks();
    let selected: Vec<&dyn tasks::Task> = all.iter().map(AsRef::as_ref).collect();
    run_tasks_to_completion(&selected, &ctx, &log).unwrap();

    assert_eq!(repo.read("home/.bashrc"), "alias ll='ls -la'\n");
    assert_eq!(repo.read("etc/fstab"), FSTAB);
    assert_eq!(executor.calls(), vec![
        "dpkg-query -W -f=${db:Status-Status} ${Package}\\n".to_string()
    ]);
    assert!(
        log.task_entries()
            .iter()
            .all(|e| matches!(e.status, TaskStatus::DryRun | TaskStatus::NotApplicable))
    );
}

#[test]
fn only_filter_runs_selected_tasks() {
    let repo = repo();
    let executor = executor();
    let log = Arc::new(Logger::with_log_file(None));
    let ctx = make_context(&repo, &executor, &log, false);

    let all = tasks::all_install_tasks();
    let opts = InstallOpts {
        skip: vec![],
        only: vec!["blocks".to_string()],
    };
    run_tasks_to_completion(&select_tasks(&all, &opts), &ctx, &log).unwrap();

    assert_eq!(log.task_entries().len(), 1);
    assert!(executor.calls().is_empty());
    assert!(repo.read("home/.bashrc").contains("export EDITOR=vim"));
    assert_eq!(repo.read("etc/fstab"), FSTAB);
}

#[test]
fn interrupt_skips_remaining_tasks() {
    let repo = repo();
    let executor = executor();
    let log = Arc::new(Logger::with_log_file(None));
    let ctx = make_context(&repo, &executor, &log, false);
    ctx.interrupted.store(true, Ordering::SeqCst);

    let all = tasks::all_install_tasks();
    let selected: Vec<&dyn tasks::Task> = all.iter().map(AsRef::as_ref).collect();
    let err = run_tasks_to_completion(&selected, &ctx, &log).unwrap_err();

    assert_eq!(err.to_string(), "Interrupted after 0 of 7 tasks");
    assert!(
        log.task_entries()
            .iter()
            .all(|e| e.status == TaskStatus::Skipped)
    );
    assert!(executor.calls().is_empty());
}

#[test]
fn failed_task_fails_the_run() {
    let repo = repo();
    let executor = Arc::new(
        ScriptedExecutor::new(&["systemctl"])
            .output("dpkg-query", "installed git\n")
            .failing("systemctl restart"),
    );
    let log = Arc::new(Logger::with_log_file(None));
    let ctx = make_context(&repo, &executor, &log, false);

    let all = tasks::all_install_tasks();
    let selected: Vec<&dyn tasks::Task> = all.iter().map(AsRef::as_ref).collect();
    let err = run_tasks_to_completion(&selected, &ctx, &log).unwrap_err();

    assert_eq!(err.to_string(), "1 task(s) failed");
    assert_eq!(log.failure_count(), 1);
}
