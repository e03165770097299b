// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed repository with a fake home, plus a
// scripted executor so that tasks can run end to end without touching the
// host system.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use syskit::config::Config;
use syskit::exec::{ExecResult, Executor};
use syskit::logging::{Log, Logger};
use syskit::platform::Platform;
use syskit::resources::package::PackageManager;
use syskit::tasks::Context;

/// An isolated repository (`conf/`, `blocks/`) and home directory.
pub struct TestRepo {
    /// Temporary directory holding `repo/` and `home/`.
    pub dir: tempfile::TempDir,
}

impl TestRepo {
    /// Create an empty repository with a `conf/` directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(dir.path().join("repo/conf")).expect("create conf dir");
        std::fs::create_dir_all(dir.path().join("repo/blocks")).expect("create blocks dir");
        std::fs::create_dir_all(dir.path().join("home")).expect("create home dir");
        Self { dir }
    }

    /// Repository root.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    /// Fake home directory.
    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    /// Write `conf/<name>`.
    pub fn conf(self, name: &str, content: &str) -> Self {
        std::fs::write(self.root().join("conf").join(name), content).expect("write conf file");
        self
    }

    /// Write `blocks/<name>`.
    pub fn block(self, name: &str, content: &str) -> Self {
        std::fs::write(self.root().join("blocks").join(name), content).expect("write block");
        self
    }

    /// Write an arbitrary file under the temporary directory.
    pub fn file(self, rel: &str, content: &str) -> Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, content).expect("write file");
        self
    }

    /// Absolute path of `rel` under the temporary directory.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Read a file under the temporary directory.
    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).expect("read file")
    }

    /// Load the repository configuration against the fake home.
    pub fn load_config(&self) -> Config {
        Config::load(&self.root(), &self.home()).expect("load config")
    }
}

/// Executor that records command lines and answers from scripted rules.
///
/// The first rule whose pattern is contained in the command line decides the
/// outcome; anything unmatched succeeds with empty output.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    programs: Vec<String>,
    rules: Vec<(String, bool, String)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    /// Executor whose `which` finds exactly `programs`.
    pub fn new(programs: &[&str]) -> Self {
        Self {
            programs: programs.iter().map(|p| (*p).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Commands containing `pattern` succeed with `stdout`.
    pub fn output(mut self, pattern: &str, stdout: &str) -> Self {
        self.rules.push((pattern.to_string(), true, stdout.to_string()));
        self
    }

    /// Commands containing `pattern` fail.
    pub fn failing(mut self, pattern: &str) -> Self {
        self.rules.push((pattern.to_string(), false, String::new()));
        self
    }

    /// Command lines issued so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn answer(&self, program: &str, args: &[&str]) -> ExecResult {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let (success, stdout) = self
            .rules
            .iter()
            .find(|(pattern, _, _)| line.contains(pattern.as_str()))
            .map_or((true, String::new()), |(_, ok, out)| (*ok, out.clone()));
        self.calls.lock().expect("calls lock").push(line);
        ExecResult {
            stdout,
            stderr: if success { String::new() } else { "scripted failure".to_string() },
            success,
            code: Some(i32::from(!success)),
        }
    }
}

impl Executor for ScriptedExecutor {
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        let result = self.answer(program, args);
        if result.success {
            Ok(result)
        } else {
            anyhow::bail!("{program} failed: {}", result.stderr)
        }
    }

    fn run_in(&self, _: &Path, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        self.run(program, args)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
        Ok(self.answer(program, args))
    }

    fn which(&self, program: &str) -> bool {
        self.programs.iter().any(|p| p == program)
    }
}

/// Build a sequential task context for `repo` running as root with apt.
pub fn make_context(
    repo: &TestRepo,
    executor: &Arc<ScriptedExecutor>,
    log: &Arc<Logger>,
    dry_run: bool,
) -> Context {
    let shared_exec: Arc<dyn Executor> = Arc::<ScriptedExecutor>::clone(executor);
    let shared_log: Arc<dyn Log> = Arc::<Logger>::clone(log);
    let mut ctx = Context::new(
        Arc::new(repo.load_config()),
        Arc::new(Platform::new(Some(PackageManager::Apt), true)),
        shared_log,
        dry_run,
        shared_exec,
        false,
    )
    .expect("create context");
    ctx.home = repo.home();
    ctx.backup = false;
    ctx
}
