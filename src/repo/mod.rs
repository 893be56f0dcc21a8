//! Bare-repository adapter.
//!
//! The dotfiles live in a bare repository (default `~/.dotfiles`) whose work
//! tree is `$HOME`. Every git invocation goes through [`BareRepo::git`], which
//! prefixes `--git-dir`/`--work-tree`, runs from the work tree, and turns a
//! non-zero exit into a [`GitCommandError`] carrying stderr.
mod branch;
mod push;
mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use branch::{BranchResolution, resolve as resolve_branch};
pub use push::{PushPlan, RefState};
pub use status::{FileState, StatusEntry, parse_porcelain};

use crate::error::{FreckleError, GitCommandError};
use crate::exec::{ExecResult, Executor};
use crate::logging::Log;

/// Result alias for raw git calls.
pub type GitResult<T> = Result<T, GitCommandError>;

/// One blob in a tree listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// File mode, e.g. `100644`.
    pub mode: String,
    /// Blob object id.
    pub oid: String,
    /// Home-relative path.
    pub path: String,
}

/// One line of `git log` summary output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// Abbreviated hash.
    pub hash: String,
    /// Author date, `YYYY-MM-DD`.
    pub date: String,
    /// First line of the message.
    pub subject: String,
}

/// Handle to the bare dotfiles repository.
#[derive(Debug, Clone)]
pub struct BareRepo {
    git_dir: PathBuf,
    work_tree: PathBuf,
    executor: Arc<dyn Executor>,
    log: Arc<dyn Log>,
}

impl BareRepo {
    /// Create a handle; nothing is touched on disk.
    #[must_use]
    pub fn new(
        git_dir: PathBuf,
        work_tree: PathBuf,
        executor: Arc<dyn Executor>,
        log: Arc<dyn Log>,
    ) -> Self {
        Self {
            git_dir,
            work_tree,
            executor,
            log,
        }
    }

    /// Path of the bare repository.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Path of the work tree (`$HOME`).
    #[must_use]
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    /// Whether the bare repository exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.git_dir.join("HEAD").is_file()
    }

    /// Fail with [`FreckleError::NotInitialized`] unless the repository exists.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::NotInitialized`] when there is no repository.
    pub fn ensure_exists(&self) -> Result<(), FreckleError> {
        if self.exists() {
            Ok(())
        } else {
            Err(FreckleError::NotInitialized(self.git_dir.clone()))
        }
    }

    fn run_git(
        &self,
        args: &[&str],
        env: &[(&str, &str)],
        with_repo: bool,
    ) -> GitResult<ExecResult> {
        let git_dir = self.git_dir.to_string_lossy();
        let work_tree = self.work_tree.to_string_lossy();
        let mut full: Vec<&str> = Vec::with_capacity(args.len() + 4);
        if with_repo {
            full.extend(["--git-dir", &*git_dir, "--work-tree", &*work_tree]);
        }
        full.extend_from_slice(args);
        // git reads the user's identity from the work tree's home.
        let mut envs: Vec<(&str, &str)> = vec![("HOME", &*work_tree)];
        envs.extend_from_slice(env);

        let command = args.join(" ");
        self.log.debug(&format!("git {command}"));
        let result = self
            .executor
            .run_unchecked_in(&self.work_tree, "git", &full, &envs)
            .map_err(|e| GitCommandError {
                command: command.clone(),
                code: None,
                stderr: format!("{e:#}"),
            })?;
        if result.success {
            Ok(result)
        } else {
            self.log
                .debug(&format!("git {command}: {}", result.stderr.trim()));
            Err(GitCommandError {
                command,
                code: result.code,
                stderr: result.stderr,
            })
        }
    }

    /// Run git against the bare repository.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if git cannot be spawned or exits non-zero.
    pub fn git(&self, args: &[&str]) -> GitResult<ExecResult> {
        self.run_git(args, &[], true)
    }

    fn probe(&self, args: &[&str]) -> bool {
        self.git(args).is_ok()
    }

    fn lines(&self, args: &[&str]) -> GitResult<Vec<String>> {
        Ok(self
            .git(args)?
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn nul_separated(&self, args: &[&str]) -> GitResult<Vec<String>> {
        Ok(self
            .git(args)?
            .stdout
            .split('\0')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Create an empty bare repository whose unborn branch is `branch`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if `git init` fails.
    pub fn init(&self, branch: &str) -> GitResult<()> {
        let dir = self.git_dir.to_string_lossy();
        let initial = format!("--initial-branch={branch}");
        self.run_git(&["init", "--bare", "--quiet", &initial, &dir], &[], false)?;
        self.configure()
    }

    /// Bare-clone `url` and fetch remote-tracking refs.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the clone or fetch fails.
    pub fn clone_from(&self, url: &str) -> GitResult<()> {
        let dir = self.git_dir.to_string_lossy();
        self.run_git(&["clone", "--bare", "--quiet", url, &dir], &[], false)?;
        self.configure()?;
        self.fetch()
    }

    /// Hide untracked files from status and map remote branches to
    /// `refs/remotes/origin/*` (a bare clone does not by default).
    fn configure(&self) -> GitResult<()> {
        self.git(&["config", "status.showUntrackedFiles", "no"])?;
        if self.has_remote() {
            self.git(&[
                "config",
                "remote.origin.fetch",
                "+refs/heads/*:refs/remotes/origin/*",
            ])?;
        }
        Ok(())
    }

    /// Point `HEAD` at `branch`, which may not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the name is not a valid ref.
    pub fn set_head(&self, branch: &str) -> GitResult<()> {
        let full = format!("refs/heads/{branch}");
        self.git(&["symbolic-ref", "HEAD", &full])?;
        Ok(())
    }

    /// Record a commit with no file changes, e.g. the root of a new repo.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the commit fails.
    pub fn commit_empty(&self, message: &str) -> GitResult<()> {
        self.git(&["commit", "--quiet", "--allow-empty", "-m", message])?;
        Ok(())
    }

    /// Add `origin` or repoint it at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the remote cannot be written.
    pub fn set_remote(&self, url: &str) -> GitResult<()> {
        if self.has_remote() {
            self.git(&["remote", "set-url", "origin", url])?;
        } else {
            self.git(&["remote", "add", "origin", url])?;
        }
        self.configure()
    }

    /// Whether an `origin` remote is configured.
    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.probe(&["remote", "get-url", "origin"])
    }

    /// URL of `origin`, if configured.
    #[must_use]
    pub fn remote_url(&self) -> Option<String> {
        self.git(&["remote", "get-url", "origin"])
            .ok()
            .map(|r| r.stdout.trim().to_string())
    }

    /// Fetch `origin`, pruning deleted branches.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the remote is unreachable.
    pub fn fetch(&self) -> GitResult<()> {
        self.git(&["fetch", "--quiet", "--prune", "origin"])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Refs and branches
    // ------------------------------------------------------------------

    /// Branch `HEAD` points at, read from git each time.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] when `HEAD` is detached.
    pub fn current_branch(&self) -> GitResult<String> {
        Ok(self
            .git(&["symbolic-ref", "--short", "HEAD"])?
            .stdout
            .trim()
            .to_string())
    }

    /// Whether `HEAD` resolves to a commit.
    #[must_use]
    pub fn head_exists(&self) -> bool {
        self.probe(&["rev-parse", "--verify", "--quiet", "HEAD"])
    }

    /// Whether `refs/heads/<name>` exists.
    #[must_use]
    pub fn branch_exists(&self, name: &str) -> bool {
        let full = format!("refs/heads/{name}");
        self.probe(&["show-ref", "--verify", "--quiet", &full])
    }

    /// Whether `refs/remotes/origin/<name>` exists.
    #[must_use]
    pub fn remote_branch_exists(&self, name: &str) -> bool {
        let full = format!("refs/remotes/origin/{name}");
        self.probe(&["show-ref", "--verify", "--quiet", &full])
    }

    /// Local branch names.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if refs cannot be listed.
    pub fn local_branches(&self) -> GitResult<Vec<String>> {
        self.lines(&["for-each-ref", "--format=%(refname:short)", "refs/heads"])
    }

    /// Remote branch names with the `origin/` prefix removed.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if refs cannot be listed.
    pub fn remote_branches(&self) -> GitResult<Vec<String>> {
        Ok(self
            .lines(&["for-each-ref", "--format=%(refname)", "refs/remotes/origin"])?
            .into_iter()
            .filter_map(|r| r.strip_prefix("refs/remotes/origin/").map(String::from))
            .filter(|b| b != "HEAD")
            .collect())
    }

    /// Union of local and remote branch names, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if refs cannot be listed.
    pub fn list_branches(&self) -> GitResult<Vec<String>> {
        let mut all = self.local_branches()?;
        all.extend(self.remote_branches()?);
        all.sort();
        all.dedup();
        Ok(all)
    }

    /// The remote's default branch, when `origin/HEAD` is set.
    #[must_use]
    pub fn remote_head(&self) -> Option<String> {
        self.git(&["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
            .ok()
            .and_then(|r| r.stdout.trim().strip_prefix("origin/").map(String::from))
    }

    /// Create `name` at `start` (or `HEAD`).
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the branch exists or `start` is invalid.
    pub fn create_branch(&self, name: &str, start: Option<&str>) -> GitResult<()> {
        let mut args = vec!["branch", name];
        args.extend(start);
        self.git(&args)?;
        Ok(())
    }

    /// Delete local branch `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if git refuses.
    pub fn delete_branch(&self, name: &str) -> GitResult<()> {
        self.git(&["branch", "--quiet", "-D", name])?;
        Ok(())
    }

    /// Delete `name` on `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the push fails.
    pub fn delete_remote_branch(&self, name: &str) -> GitResult<()> {
        self.git(&["push", "--quiet", "origin", "--delete", name])?;
        Ok(())
    }

    /// Switch the work tree to `name`. A branch that only exists on the
    /// remote is created tracking it.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if git would overwrite local changes.
    pub fn checkout(&self, name: &str) -> GitResult<()> {
        self.git(&["checkout", "--quiet", name])?;
        Ok(())
    }

    /// Switch to `name`, overwriting work-tree files.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the branch does not exist.
    pub fn checkout_force(&self, name: &str) -> GitResult<()> {
        self.git(&["checkout", "--quiet", "--force", name])?;
        Ok(())
    }

    /// Reset `paths` in the work tree and index to their `HEAD` content.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if a path is not in `HEAD`.
    pub fn restore_from_head(&self, paths: &[String]) -> GitResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["checkout", "--quiet", "HEAD", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(&args)?;
        Ok(())
    }

    /// Fast-forward the current branch to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if a fast-forward is impossible or would
    /// overwrite local files.
    pub fn merge_ff_only(&self, target: &str) -> GitResult<()> {
        self.git(&["merge", "--ff-only", "--quiet", target])?;
        Ok(())
    }

    /// Commits on `local` missing from `upstream`, and the reverse.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if either ref is unknown.
    pub fn ahead_behind(&self, local: &str, upstream: &str) -> GitResult<(u32, u32)> {
        let range = format!("{local}...{upstream}");
        let out = self.git(&["rev-list", "--left-right", "--count", &range])?;
        let mut counts = out
            .stdout
            .split_whitespace()
            .map(|n| n.parse::<u32>().unwrap_or(0));
        Ok((counts.next().unwrap_or(0), counts.next().unwrap_or(0)))
    }

    /// Local and remote state of `branch` for push and update decisions.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if counting commits fails.
    pub fn ref_state(&self, branch: &str) -> GitResult<RefState> {
        let local = self.branch_exists(branch);
        let remote = self.remote_branch_exists(branch);
        let (ahead, behind) = if local && remote {
            self.ahead_behind(branch, &format!("origin/{branch}"))?
        } else {
            (0, 0)
        };
        Ok(RefState {
            local,
            remote,
            ahead,
            behind,
        })
    }

    /// Push `branch` according to the [`PushPlan`] table. Returns the plan
    /// that was acted on; blocked plans make no git call.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the push itself fails.
    pub fn push(&self, branch: &str) -> GitResult<PushPlan> {
        let plan = PushPlan::from_state(self.ref_state(branch)?);
        match plan {
            PushPlan::SetUpstream => {
                self.git(&["push", "--quiet", "-u", "origin", branch])?;
            }
            PushPlan::FastForward { .. } => {
                self.git(&["push", "--quiet", "origin", branch])?;
            }
            PushPlan::NoCommits
            | PushPlan::UpToDate
            | PushPlan::Behind { .. }
            | PushPlan::Diverged { .. } => {}
        }
        Ok(plan)
    }

    // ------------------------------------------------------------------
    // Index and work tree
    // ------------------------------------------------------------------

    /// Status of tracked files.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if status fails.
    pub fn status(&self) -> GitResult<Vec<StatusEntry>> {
        let out = self.git(&["status", "--porcelain=v1", "-z"])?;
        Ok(parse_porcelain(&out.stdout))
    }

    /// Status of `paths`, including untracked ones.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if status fails.
    pub fn status_of(&self, paths: &[String]) -> GitResult<Vec<StatusEntry>> {
        let mut args = vec!["status", "--porcelain=v1", "-z", "--untracked-files=all", "--"];
        args.extend(paths.iter().map(String::as_str));
        let out = self.git(&args)?;
        Ok(parse_porcelain(&out.stdout))
    }

    /// Paths in the index.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the index cannot be read.
    pub fn tracked_files(&self) -> GitResult<Vec<String>> {
        self.nul_separated(&["ls-files", "-z"])
    }

    /// Whether `path` is in the index.
    #[must_use]
    pub fn is_tracked(&self, path: &str) -> bool {
        self.probe(&["ls-files", "--error-unmatch", "--", path])
    }

    /// Stage `paths`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if a path is missing.
    pub fn add(&self, paths: &[String]) -> GitResult<()> {
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(&args)?;
        Ok(())
    }

    /// Stage modifications and deletions of tracked files.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if staging fails.
    pub fn add_tracked(&self) -> GitResult<()> {
        self.git(&["add", "--update"])?;
        Ok(())
    }

    /// Stop tracking `paths`; with `keep_file` the work-tree copy stays.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::NotTracked`] for the first path not in the
    /// index, or [`FreckleError::Git`] if `git rm` fails.
    pub fn remove(&self, paths: &[String], keep_file: bool) -> Result<(), FreckleError> {
        if let Some(missing) = paths.iter().find(|p| !self.is_tracked(p)) {
            return Err(FreckleError::NotTracked(missing.clone()));
        }
        let mut args = vec!["rm", "--quiet", "-r"];
        if keep_file {
            args.push("--cached");
        }
        args.push("--");
        args.extend(paths.iter().map(String::as_str));
        self.git(&args)?;
        Ok(())
    }

    /// Whether the index differs from `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the comparison fails.
    pub fn has_staged_changes(&self) -> GitResult<bool> {
        match self.git(&["diff", "--cached", "--quiet"]) {
            Ok(_) => Ok(false),
            Err(e) if e.code == Some(1) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Commit the index.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::NothingToCommit`] when nothing is staged, or
    /// [`FreckleError::Git`] if the commit fails.
    pub fn commit(&self, message: &str) -> Result<(), FreckleError> {
        if !self.has_staged_changes()? {
            return Err(FreckleError::NothingToCommit);
        }
        self.git(&["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    /// Commit only `paths` from the work tree, leaving anything else staged
    /// alone. Returns `false` when those paths already match `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the diff or commit fails.
    pub fn commit_paths(&self, message: &str, paths: &[String]) -> GitResult<bool> {
        let mut diff = vec!["diff", "--quiet", "HEAD", "--"];
        diff.extend(paths.iter().map(String::as_str));
        match self.git(&diff) {
            Ok(_) => return Ok(false),
            Err(e) if e.code == Some(1) => {}
            Err(e) => return Err(e),
        }
        let mut args = vec!["commit", "--quiet", "-m", message, "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(&args)?;
        Ok(true)
    }

    /// Paths whose work-tree content differs from `HEAD`; empty before the
    /// first commit.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the diff fails.
    pub fn changed_files(&self) -> GitResult<Vec<String>> {
        if !self.head_exists() {
            return Ok(Vec::new());
        }
        self.nul_separated(&["diff", "--name-only", "-z", "HEAD"])
    }

    /// Paths `origin/<branch>` changed since it split from `branch`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if either ref is unknown.
    pub fn incoming_files(&self, branch: &str) -> GitResult<Vec<String>> {
        let range = format!("{branch}...origin/{branch}");
        self.nul_separated(&["diff", "--name-only", "-z", &range])
    }

    /// Paths that differ between two refs.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if either ref is unknown.
    pub fn changed_between(&self, from: &str, to: &str) -> GitResult<Vec<String>> {
        self.nul_separated(&["diff", "--name-only", "-z", from, to])
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Every blob reachable from `reference`, recursively.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if `reference` is unknown.
    pub fn tree_entries(&self, reference: &str) -> GitResult<Vec<TreeEntry>> {
        let records = self.nul_separated(&["ls-tree", "-r", "-z", "--full-tree", reference])?;
        Ok(records
            .iter()
            .filter_map(|record| {
                let (meta, path) = record.split_once('\t')?;
                let mut parts = meta.split_whitespace();
                let mode = parts.next()?;
                let kind = parts.next()?;
                let oid = parts.next()?;
                (kind == "blob").then(|| TreeEntry {
                    mode: mode.to_string(),
                    oid: oid.to_string(),
                    path: path.to_string(),
                })
            })
            .collect())
    }

    /// Blob ids the work-tree copies of `paths` would hash to.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if a path cannot be read.
    pub fn hash_files(&self, paths: &[String]) -> GitResult<Vec<String>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec!["hash-object", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.lines(&args)
    }

    /// Content of `path` at `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the path does not exist there.
    pub fn show(&self, reference: &str, path: &str) -> GitResult<String> {
        let spec = format!("{reference}:{path}");
        Ok(self.git(&["show", &spec])?.stdout)
    }

    /// Object id `spec` resolves to.
    #[must_use]
    pub fn resolve(&self, spec: &str) -> Option<String> {
        self.git(&["rev-parse", "--verify", "--quiet", spec])
            .ok()
            .map(|r| r.stdout.trim().to_string())
    }

    /// Recent commits on `reference`, optionally limited to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if the log cannot be read.
    pub fn log_summary(
        &self,
        reference: &str,
        path: Option<&str>,
        limit: usize,
    ) -> GitResult<Vec<CommitSummary>> {
        let count = format!("--max-count={limit}");
        let mut args = vec![
            "log",
            count.as_str(),
            "--format=%h%x1f%ad%x1f%s",
            "--date=short",
            reference,
            "--",
        ];
        args.extend(path);
        Ok(self
            .lines(&args)?
            .iter()
            .filter_map(|line| {
                let mut fields = line.splitn(3, '\u{1f}');
                Some(CommitSummary {
                    hash: fields.next()?.to_string(),
                    date: fields.next()?.to_string(),
                    subject: fields.next().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    /// Write the work-tree copy of `path` onto `branch` as a new commit
    /// without checking the branch out. Uses a scratch index so the real
    /// index and work tree are untouched. Returns `false` when the branch
    /// already has identical content.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if any plumbing step fails.
    pub fn commit_file_to_branch(&self, branch: &str, path: &str, message: &str) -> GitResult<bool> {
        let blob = self
            .git(&["hash-object", "-w", "--", path])?
            .stdout
            .trim()
            .to_string();
        if self.resolve(&format!("{branch}:{path}")).as_deref() == Some(blob.as_str()) {
            return Ok(false);
        }
        let parent = self.resolve(branch).ok_or_else(|| GitCommandError {
            command: format!("rev-parse {branch}"),
            code: None,
            stderr: format!("unknown branch '{branch}'"),
        })?;

        let index = self.git_dir.join(format!("freckle-{branch}.index").replace('/', "-"));
        let index_str = index.to_string_lossy().to_string();
        let env = [("GIT_INDEX_FILE", index_str.as_str())];
        let mode = file_mode(&self.work_tree.join(path));
        let cacheinfo = format!("{mode},{blob},{path}");

        let tree = (|| -> GitResult<String> {
            self.run_git(&["read-tree", branch], &env, true)?;
            self.run_git(&["update-index", "--add", "--cacheinfo", &cacheinfo], &env, true)?;
            Ok(self.run_git(&["write-tree"], &env, true)?.stdout.trim().to_string())
        })();
        std::fs::remove_file(&index).ok();
        let tree = tree?;

        let commit = self
            .git(&["commit-tree", &tree, "-p", &parent, "-m", message])?
            .stdout
            .trim()
            .to_string();
        let full = format!("refs/heads/{branch}");
        self.git(&["update-ref", &full, &commit, &parent])?;
        Ok(true)
    }

    /// Run git attached to the terminal and return its exit code.
    ///
    /// # Errors
    ///
    /// Returns [`GitCommandError`] if git cannot be spawned.
    pub fn passthrough(&self, args: &[&str]) -> GitResult<i32> {
        let git_dir = self.git_dir.to_string_lossy();
        let work_tree = self.work_tree.to_string_lossy();
        let mut full = vec!["--git-dir", &*git_dir, "--work-tree", &*work_tree];
        full.extend_from_slice(args);
        let command = args.join(" ");
        self.log.debug(&format!("git {command}"));
        self.executor
            .run_interactive(&self.work_tree, "git", &full, &[("HOME", &*work_tree)])
            .map_err(|e| GitCommandError {
                command,
                code: None,
                stderr: format!("{e:#}"),
            })
    }
}

#[cfg(unix)]
fn file_mode(path: &Path) -> &'static str {
    use std::os::unix::fs::PermissionsExt as _;
    match std::fs::metadata(path) {
        Ok(m) if m.permissions().mode() & 0o111 != 0 => "100755",
        _ => "100644",
    }
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> &'static str {
    "100644"
}
