// Shared helpers for integration tests.
//
// Each test gets a temporary directory holding a fake home (with its own
// .gitconfig so commits have an identity), a bare "remote" repository, and a
// regular clone of that remote ("seed") used to play another machine that
// pushes commits.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code, clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use freckle::config::Config;
use freckle::context::Context;
use freckle::exec::{Executor, SystemExecutor};
use freckle::logging::{Log, TaskEntry, TaskStatus};
use freckle::platform::{Os, Platform};

const GITCONFIG: &str = "\
[user]
\tname = Freckle Test
\temail = test@example.com
[init]
\tdefaultBranch = main
[commit]
\tgpgsign = false
[advice]
\tdetachedHead = false
";

/// Run git in `dir` with `HOME` pointing at `home`, panicking on failure.
pub fn git(dir: &Path, home: &Path, args: &[&str]) -> String {
    let out = git_output(dir, home, args);
    assert!(
        out.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Like [`git`] but reports success instead of panicking.
pub fn git_ok(dir: &Path, home: &Path, args: &[&str]) -> bool {
    git_output(dir, home, args).status.success()
}

fn git_output(dir: &Path, home: &Path, args: &[&str]) -> std::process::Output {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("HOME", home)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .output()
        .expect("spawn git")
}

/// [`Log`] that keeps every line and task in memory.
#[derive(Debug, Default)]
pub struct TestLog {
    lines: Mutex<Vec<String>>,
    tasks: Mutex<Vec<TaskEntry>>,
}

impl TestLog {
    fn push(&self, level: &str, msg: &str) {
        self.lines.lock().unwrap().push(format!("{level}: {msg}"));
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    pub fn tasks(&self) -> Vec<TaskEntry> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn task_status(&self, name: &str) -> Option<TaskStatus> {
        self.tasks()
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.status)
    }
}

impl Log for TestLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
    fn dry_run(&self, msg: &str) {
        self.push("dry_run", msg);
    }
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        self.tasks.lock().unwrap().push(TaskEntry {
            name: name.to_string(),
            status,
            message: message.map(String::from),
        });
    }
}

/// An isolated home, remote and seed clone backed by a [`tempfile::TempDir`].
pub struct TestEnv {
    pub tmp: tempfile::TempDir,
    pub log: Arc<TestLog>,
}

impl TestEnv {
    pub fn home(&self) -> PathBuf {
        self.tmp.path().join("home")
    }

    pub fn remote(&self) -> PathBuf {
        self.tmp.path().join("remote.git")
    }

    pub fn seed(&self) -> PathBuf {
        self.tmp.path().join("seed")
    }

    pub fn backups(&self) -> PathBuf {
        self.tmp.path().join("data").join("backups")
    }

    /// Context over the fake home with the real git executor. The config
    /// is re-read from disk on every call.
    pub fn context(&self) -> Context {
        self.context_with(Arc::new(SystemExecutor))
    }

    /// Context with a custom executor.
    pub fn context_with(&self, executor: Arc<dyn Executor>) -> Context {
        let config = Config::load(&self.home(), "tester").expect("load config");
        Context::new(
            Arc::new(config),
            Arc::new(Platform::new(Os::Linux, false)),
            Arc::clone(&self.log) as Arc<dyn Log>,
            self.home(),
            executor,
        )
        .with_backup_root(self.backups())
        .with_parallel(false)
    }

    /// Dry-run variant of [`context`](Self::context).
    pub fn dry_run_context(&self) -> Context {
        self.context().with_dry_run(true)
    }

    pub fn write_home(&self, rel: &str, content: &str) {
        let path = self.home().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn read_home(&self, rel: &str) -> String {
        std::fs::read_to_string(self.home().join(rel))
            .unwrap_or_else(|e| panic!("read ~/{rel}: {e}"))
    }

    /// git against the dotfiles repository, bypassing freckle.
    pub fn dotfiles_git(&self, args: &[&str]) -> String {
        let home = self.home();
        let git_dir = home.join(".dotfiles");
        let git_dir = git_dir.to_str().unwrap();
        let work_tree = home.to_str().unwrap();
        let mut full = vec!["--git-dir", git_dir, "--work-tree", work_tree];
        full.extend_from_slice(args);
        git(&home, &home, &full)
    }

    /// git against the bare remote.
    pub fn remote_git(&self, args: &[&str]) -> String {
        let remote = self.remote();
        let mut full = vec!["--git-dir", remote.to_str().unwrap()];
        full.extend_from_slice(args);
        git(self.tmp.path(), &self.home(), &full)
    }

    /// Commit `files` on `branch` from the seed clone and push it, as
    /// another machine would. A new branch starts from whatever the seed
    /// has checked out.
    pub fn remote_commit(&self, branch: &str, files: &[(&str, &str)], message: &str) {
        let seed = self.seed();
        let home = self.home();
        git(&seed, &home, &["fetch", "--quiet", "origin"]);
        let tracking = format!("origin/{branch}");
        if git_ok(&seed, &home, &["rev-parse", "--verify", "--quiet", &tracking]) {
            git(&seed, &home, &["checkout", "--quiet", "-B", branch, &tracking]);
        } else if git_ok(&seed, &home, &["rev-parse", "--verify", "--quiet", "HEAD"]) {
            git(&seed, &home, &["checkout", "--quiet", "-B", branch]);
        } else {
            git(&seed, &home, &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]);
        }
        for (rel, content) in files {
            let path = seed.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        git(&seed, &home, &["add", "-A"]);
        git(&seed, &home, &["commit", "--quiet", "-m", message]);
        git(&seed, &home, &["push", "--quiet", "origin", branch]);
    }
}

/// Fluent builder for [`TestEnv`].
pub struct TestEnvBuilder {
    config: String,
    with_url: bool,
    remote_files: Vec<(String, Vec<(String, String)>)>,
}

impl TestEnvBuilder {
    pub fn new() -> Self {
        Self {
            config: String::new(),
            with_url: true,
            remote_files: Vec::new(),
        }
    }

    /// Extra YAML appended after the `dotfiles:` section.
    pub fn config(mut self, yaml: &str) -> Self {
        self.config.push_str(yaml);
        self
    }

    /// Leave `dotfiles.repo_url` unset.
    pub fn without_url(mut self) -> Self {
        self.with_url = false;
        self
    }

    /// Commit these files on `branch` of the remote before the test runs.
    pub fn remote_branch(mut self, branch: &str, files: &[(&str, &str)]) -> Self {
        self.remote_files.push((
            branch.to_string(),
            files
                .iter()
                .map(|(p, c)| ((*p).to_string(), (*c).to_string()))
                .collect(),
        ));
        self
    }

    pub fn build(self) -> TestEnv {
        let env = TestEnv {
            tmp: tempfile::tempdir().expect("create temp dir"),
            log: Arc::new(TestLog::default()),
        };
        let home = env.home();
        std::fs::create_dir_all(&home).unwrap();
        std::fs::write(home.join(".gitconfig"), GITCONFIG).unwrap();

        let remote = env.remote();
        git(
            env.tmp.path(),
            &home,
            &["init", "--bare", "--quiet", "--initial-branch=main", remote.to_str().unwrap()],
        );
        git(
            env.tmp.path(),
            &home,
            &["clone", "--quiet", remote.to_str().unwrap(), env.seed().to_str().unwrap()],
        );
        for (branch, files) in &self.remote_files {
            let files: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
            env.remote_commit(branch, &files, &format!("seed {branch}"));
        }

        let mut yaml = String::from("dotfiles:\n  branch: main\n");
        if self.with_url {
            yaml.push_str(&format!("  repo_url: {}\n", remote.display()));
        }
        yaml.push_str(&self.config);
        std::fs::write(home.join(".freckle.yaml"), yaml).unwrap();
        env
    }
}

impl Default for TestEnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}
