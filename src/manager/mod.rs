//! Dotfiles orchestration on top of the bare repository and the conflict
//! resolver.
//!
//! The repository moves through four observable states:
//!
//! ```text
//! Uninitialized ──sync/init──▶ Clean ◀──backup── Dirty
//!                                │  ▲              ▲
//!                                │  └──update──────┤
//!                                ▼                 │
//!                            Diverged ─(manual)────┘
//! ```
//!
//! Every state is recomputed from git on demand; nothing is cached between
//! calls.
pub mod doctor;
pub mod paths;
pub mod profile;
pub mod propagate;

use std::fmt;
use std::path::Path;

use chrono::Local;

use crate::config::profiles;
use crate::context::Context;
use crate::error::{ConfigError, FreckleError};
use crate::repo::{
    BareRepo, FileState, PushPlan, RefState, StatusEntry, resolve_branch,
};
use crate::restore::{ConflictResolver, Resolution, RestorePoints};
use crate::secrets::SecretScanner;

/// Observable repository state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    /// No bare repository yet.
    Uninitialized,
    /// Work tree matches `HEAD`.
    Clean,
    /// Tracked files have local changes.
    Dirty,
    /// Local and remote both have commits the other lacks.
    Diverged,
}

impl fmt::Display for RepoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "not initialized",
            Self::Clean => "clean",
            Self::Dirty => "local changes",
            Self::Diverged => "diverged",
        })
    }
}

/// Snapshot for `freckle status`.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Overall state.
    pub state: RepoState,
    /// Branch checked out, read from git; `None` when detached or absent.
    pub branch: Option<String>,
    /// Branch the configuration expects.
    pub expected_branch: String,
    /// Profile whose branch is checked out.
    pub profile: Option<String>,
    /// Changed tracked files.
    pub changes: Vec<StatusEntry>,
    /// Local vs `origin` for the current branch.
    pub refs: RefState,
    /// Whether `origin` is configured.
    pub has_remote: bool,
    /// Set when fetching failed; refs may be stale.
    pub fetch_error: Option<String>,
}

/// Sync status of one file, for `freckle status <file>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSyncStatus {
    /// No repository.
    NotInitialized,
    /// Neither tracked nor present.
    NotFound,
    /// Tracked but deleted from the work tree.
    Missing,
    /// Present but not tracked.
    Untracked,
    /// Matches `HEAD` and nothing incoming.
    UpToDate,
    /// Local edits not yet backed up.
    Modified,
    /// The remote has a newer version.
    Behind,
}

impl fmt::Display for FileSyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotInitialized => "not-initialized",
            Self::NotFound => "not-found",
            Self::Missing => "missing",
            Self::Untracked => "untracked",
            Self::UpToDate => "up-to-date",
            Self::Modified => "modified",
            Self::Behind => "behind",
        })
    }
}

/// Result of materializing a fresh clone.
#[derive(Debug)]
pub struct CloneReport {
    /// Branch checked out.
    pub branch: String,
    /// Why a different branch than configured was used.
    pub note: Option<String>,
    /// Files moved aside before the checkout.
    pub resolution: Resolution,
}

/// Result of `init` and `sync`.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Dry run: the action that would have been taken.
    Planned(String),
    /// Cloned and checked out.
    Cloned(CloneReport),
    /// A new empty repository was created.
    Created {
        /// Initial branch.
        branch: String,
    },
    /// `init` found an existing repository.
    AlreadyInitialized,
    /// The repository existed; its status.
    Existing(StatusReport),
}

/// Result of `add`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Paths staged (or that would be, in dry run).
    pub added: Vec<String>,
    /// Requested paths that do not exist.
    pub missing: Vec<String>,
}

/// What happened to the push step of a backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// `--no-push` or dry run.
    Skipped,
    /// No `origin` configured.
    NoRemote,
    /// Plan carried out (may be a no-op for `UpToDate`).
    Done(PushPlan),
    /// Plan refused to push.
    Blocked(PushPlan),
    /// git failed; the local commit is kept.
    Failed(String),
}

/// Result of `backup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    /// Files included in the commit.
    pub files: Vec<String>,
    /// Whether a commit was created.
    pub committed: bool,
    /// Commit message used.
    pub message: String,
    /// Push result.
    pub push: PushOutcome,
}

/// Result of `update`.
#[derive(Debug)]
pub struct UpdateReport {
    /// Branch updated.
    pub branch: String,
    /// Files changed by the fast-forward.
    pub changed: Vec<String>,
    /// Files moved aside first.
    pub resolution: Resolution,
    /// Nothing to pull.
    pub up_to_date: bool,
}

/// Default commit message for `backup`.
#[must_use]
pub fn default_backup_message() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    format!(
        "Backup from {host} at {}",
        Local::now().format("%Y-%m-%d %H:%M")
    )
}

/// Orchestrates dotfiles operations for one invocation.
#[derive(Debug)]
pub struct DotfilesManager<'a> {
    ctx: &'a Context,
    repo: BareRepo,
    points: RestorePoints,
}

impl<'a> DotfilesManager<'a> {
    /// Manager over the repository and restore points described by `ctx`.
    #[must_use]
    pub fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            repo: ctx.repo(),
            points: ctx.restore_points(),
        }
    }

    /// The underlying repository adapter.
    #[must_use]
    pub const fn repo(&self) -> &BareRepo {
        &self.repo
    }

    /// The restore point store.
    #[must_use]
    pub const fn points(&self) -> &RestorePoints {
        &self.points
    }

    fn resolver(&self) -> ConflictResolver<'_> {
        ConflictResolver::new(
            &self.repo,
            &self.points,
            self.ctx.log.as_ref(),
            self.ctx.dry_run,
        )
    }

    fn home(&self) -> &Path {
        &self.ctx.home
    }

    // ------------------------------------------------------------------
    // init / sync
    // ------------------------------------------------------------------

    /// Clone `repo_url` (or the configured URL), or create a new repository
    /// with an initial commit when no URL is known.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError`] if git fails or files cannot be moved aside.
    pub fn init(&self, repo_url: Option<&str>) -> Result<SyncOutcome, FreckleError> {
        if self.repo.exists() {
            return Ok(SyncOutcome::AlreadyInitialized);
        }
        match repo_url.or(self.ctx.config.dotfiles.repo_url.as_deref()) {
            Some(url) => self.clone_repo(url),
            None => self.create(),
        }
    }

    /// Clone when there is no repository, otherwise fetch and report status.
    ///
    /// Running it again with no changes in between moves no files and
    /// creates no restore point.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRepoUrl`] when a clone is needed but no
    /// URL is configured, or [`FreckleError`] from git.
    pub fn sync(&self) -> Result<SyncOutcome, FreckleError> {
        if self.repo.exists() {
            return Ok(SyncOutcome::Existing(self.status(true)?));
        }
        let url = self
            .ctx
            .config
            .dotfiles
            .repo_url
            .clone()
            .ok_or(ConfigError::MissingRepoUrl)?;
        self.clone_repo(&url)
    }

    fn create(&self) -> Result<SyncOutcome, FreckleError> {
        let branch = self.ctx.config.dotfiles.branch.clone();
        if self.ctx.dry_run {
            return Ok(SyncOutcome::Planned(format!(
                "create {} on branch '{branch}'",
                self.repo.git_dir().display()
            )));
        }
        self.repo.init(&branch)?;
        let config_path = self.ctx.config_path();
        let config_rel = config_path
            .strip_prefix(self.home())
            .ok()
            .map(|p| p.to_string_lossy().to_string());
        match config_rel {
            Some(rel) if config_path.is_file() => {
                self.repo.add(&[rel])?;
                self.repo.commit("Initialize dotfiles")?;
            }
            _ => self.repo.commit_empty("Initialize dotfiles")?,
        }
        self.ctx.log.info(&format!(
            "created {} on branch '{branch}'",
            self.repo.git_dir().display()
        ));
        Ok(SyncOutcome::Created { branch })
    }

    fn clone_repo(&self, url: &str) -> Result<SyncOutcome, FreckleError> {
        if self.ctx.dry_run {
            return Ok(SyncOutcome::Planned(format!(
                "clone {url} into {}",
                self.repo.git_dir().display()
            )));
        }
        self.ctx.log.stage(&format!("Cloning {url}"));
        self.repo.clone_from(url)?;
        self.materialize().map(SyncOutcome::Cloned)
    }

    /// First checkout after a clone: pick the branch, move anything in its
    /// way, then force the checkout (the index is still empty).
    fn materialize(&self) -> Result<CloneReport, FreckleError> {
        let requested = &self.ctx.config.dotfiles.branch;
        let available = self.repo.list_branches()?;
        if available.is_empty() {
            self.repo.set_head(requested)?;
            return Ok(CloneReport {
                branch: requested.clone(),
                note: Some("remote is empty; the first backup will create the branch".into()),
                resolution: Resolution::default(),
            });
        }
        let choice = resolve_branch(requested, &available, self.repo.remote_head().as_deref());
        let Some(branch) = choice.branch().map(String::from) else {
            return Err(profiles::unknown_profile(requested, &available));
        };
        if let Some(note) = choice.note() {
            self.ctx.log.warn(&note);
        }
        if !self.repo.branch_exists(&branch) {
            self.repo
                .create_branch(&branch, Some(&format!("origin/{branch}")))?;
        }
        let resolution = self
            .resolver()
            .resolve_initial(&branch, &format!("sync {branch}"))?;
        self.repo.checkout_force(&branch)?;
        Ok(CloneReport {
            branch,
            note: choice.note(),
            resolution,
        })
    }

    // ------------------------------------------------------------------
    // status
    // ------------------------------------------------------------------

    /// Current state, optionally fetching first. Read-only apart from
    /// updating remote-tracking refs.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::Git`] if status or ref inspection fails.
    pub fn status(&self, fetch: bool) -> Result<StatusReport, FreckleError> {
        let expected_branch = self.ctx.config.dotfiles.branch.clone();
        if !self.repo.exists() {
            return Ok(StatusReport {
                state: RepoState::Uninitialized,
                branch: None,
                expected_branch,
                profile: None,
                changes: Vec::new(),
                refs: RefState::default(),
                has_remote: false,
                fetch_error: None,
            });
        }
        let has_remote = self.repo.has_remote();
        let fetch_error = if fetch && has_remote {
            self.repo.fetch().err().map(|e| e.to_string())
        } else {
            None
        };
        let branch = self.repo.current_branch().ok();
        let changes: Vec<StatusEntry> = self
            .repo
            .status()?
            .into_iter()
            .filter(|e| e.state != FileState::Untracked)
            .collect();
        let refs = match &branch {
            Some(b) => self.repo.ref_state(b)?,
            None => RefState::default(),
        };
        let state = if refs.ahead > 0 && refs.behind > 0 {
            RepoState::Diverged
        } else if changes.is_empty() {
            RepoState::Clean
        } else {
            RepoState::Dirty
        };
        let profile = branch
            .as_deref()
            .and_then(|b| profiles::for_branch(&self.ctx.config, b))
            .map(|p| p.name);
        Ok(StatusReport {
            state,
            branch,
            expected_branch,
            profile,
            changes,
            refs,
            has_remote,
            fetch_error,
        })
    }

    /// Sync status of one home-relative path.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::Git`] if git inspection fails.
    pub fn file_status(&self, rel: &str) -> Result<FileSyncStatus, FreckleError> {
        if !self.repo.exists() {
            return Ok(FileSyncStatus::NotInitialized);
        }
        let present = self.home().join(rel).symlink_metadata().is_ok();
        match (self.repo.is_tracked(rel), present) {
            (false, false) => return Ok(FileSyncStatus::NotFound),
            (true, false) => return Ok(FileSyncStatus::Missing),
            (false, true) => return Ok(FileSyncStatus::Untracked),
            (true, true) => {}
        }
        if !self.repo.status_of(&[rel.to_string()])?.is_empty() {
            return Ok(FileSyncStatus::Modified);
        }
        if let Ok(branch) = self.repo.current_branch()
            && self.repo.branch_exists(&branch)
            && self.repo.remote_branch_exists(&branch)
            && self.repo.incoming_files(&branch)?.iter().any(|p| p == rel)
        {
            return Ok(FileSyncStatus::Behind);
        }
        Ok(FileSyncStatus::UpToDate)
    }

    // ------------------------------------------------------------------
    // add / remove
    // ------------------------------------------------------------------

    /// Run the secret scanner over home-relative `rels` unless `force`.
    fn secret_gate(&self, rels: &[String], force: bool) -> Result<(), FreckleError> {
        if force {
            self.ctx.log.debug("secret scan skipped (--force)");
            return Ok(());
        }
        SecretScanner::new(&self.ctx.config.secrets).check(self.home(), rels)
    }

    /// Stage files for tracking after the secret scan. `force` skips the
    /// scan for this call only.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::SecretDetected`] when the scan matches,
    /// [`FreckleError::ScanFailed`] when a path cannot be scanned,
    /// [`FreckleError::OutsideHome`] for paths outside home, or
    /// [`FreckleError::Git`] if staging fails.
    pub fn add(&self, raw: &[String], cwd: &Path, force: bool) -> Result<AddReport, FreckleError> {
        self.repo.ensure_exists()?;
        let home = self.home();
        let rels = paths::home_relative_all(raw, home, cwd)?;
        let (present, missing): (Vec<String>, Vec<String>) = rels
            .into_iter()
            .partition(|r| home.join(r).symlink_metadata().is_ok());
        for m in &missing {
            self.ctx.log.warn(&format!("skipping ~/{m}: file not found"));
        }
        if present.is_empty() {
            return Ok(AddReport {
                added: Vec::new(),
                missing,
            });
        }

        self.secret_gate(&present, force)?;

        if self.ctx.dry_run {
            for rel in &present {
                self.ctx.log.dry_run(&format!("would track ~/{rel}"));
            }
        } else {
            self.repo.add(&present)?;
        }
        Ok(AddReport {
            added: present,
            missing,
        })
    }

    /// Stop tracking files; `delete` also removes them from home.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::NotTracked`] for a path not in the index.
    pub fn remove(&self, raw: &[String], cwd: &Path, delete: bool) -> Result<Vec<String>, FreckleError> {
        self.repo.ensure_exists()?;
        let rels = paths::home_relative_all(raw, self.home(), cwd)?;
        if self.ctx.dry_run {
            if let Some(missing) = rels.iter().find(|r| !self.repo.is_tracked(r)) {
                return Err(FreckleError::NotTracked(missing.clone()));
            }
            for rel in &rels {
                let action = if delete { "untrack and delete" } else { "untrack" };
                self.ctx.log.dry_run(&format!("would {action} ~/{rel}"));
            }
            return Ok(rels);
        }
        self.repo.remove(&rels, !delete)?;
        Ok(rels)
    }

    // ------------------------------------------------------------------
    // backup / update
    // ------------------------------------------------------------------

    /// Stage changes to tracked files only, commit and optionally push.
    ///
    /// A push failure is reported in the result and never undoes the
    /// commit. With no local changes, pending commits are still pushed.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError`] if staging or committing fails.
    pub fn backup(&self, message: Option<&str>, push: bool) -> Result<BackupReport, FreckleError> {
        self.repo.ensure_exists()?;
        let files: Vec<String> = self
            .repo
            .status()?
            .into_iter()
            .filter(|e| e.state != FileState::Untracked)
            .map(|e| e.path)
            .collect();
        let message = message.map_or_else(default_backup_message, String::from);

        if self.ctx.dry_run {
            for f in &files {
                self.ctx.log.dry_run(&format!("would commit ~/{f}"));
            }
            return Ok(BackupReport {
                committed: false,
                files,
                message,
                push: PushOutcome::Skipped,
            });
        }

        let committed = if files.is_empty() {
            self.ctx.log.info("no local changes to commit");
            false
        } else {
            self.repo.add_tracked()?;
            self.repo.commit(&message)?;
            self.ctx
                .log
                .info(&format!("committed {} file(s)", files.len()));
            true
        };

        let push = if !push {
            PushOutcome::Skipped
        } else if !self.repo.has_remote() {
            PushOutcome::NoRemote
        } else {
            let branch = self.repo.current_branch()?;
            // Stale remote-tracking refs would misclassify a behind branch.
            match self.repo.fetch().and_then(|()| self.repo.push(&branch)) {
                Ok(plan) if plan.blocked_reason().is_some() => PushOutcome::Blocked(plan),
                Ok(plan) => PushOutcome::Done(plan),
                Err(e) => PushOutcome::Failed(e.to_string()),
            }
        };
        Ok(BackupReport {
            files,
            committed,
            message,
            push,
        })
    }

    /// Fetch and fast-forward the current branch, moving conflicting files
    /// into a restore point first.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::Diverged`] when a fast-forward is impossible,
    /// [`ConfigError::MissingRepoUrl`] without a remote, or other
    /// [`FreckleError`]s from git and relocation.
    pub fn update(&self) -> Result<UpdateReport, FreckleError> {
        self.repo.ensure_exists()?;
        if !self.repo.has_remote() {
            return Err(ConfigError::MissingRepoUrl.into());
        }
        self.ctx.log.stage("Fetching");
        self.repo.fetch()?;
        let branch = self.repo.current_branch()?;
        let state = self.repo.ref_state(&branch)?;
        let target = format!("origin/{branch}");
        let unchanged = |branch: String| UpdateReport {
            branch,
            changed: Vec::new(),
            resolution: Resolution::default(),
            up_to_date: true,
        };

        if !state.remote {
            self.ctx
                .log
                .info(&format!("'{branch}' does not exist on the remote yet"));
            return Ok(unchanged(branch));
        }

        match PushPlan::from_state(state) {
            PushPlan::Diverged { ahead, behind } => Err(FreckleError::Diverged {
                branch,
                ahead,
                behind,
            }),
            PushPlan::UpToDate | PushPlan::FastForward { .. } | PushPlan::SetUpstream => {
                Ok(unchanged(branch))
            }
            PushPlan::NoCommits => {
                // Local branch is unborn: take the remote's history wholesale.
                let resolution = self
                    .resolver()
                    .resolve(&target, &format!("update {branch}"))?;
                let changed: Vec<String> = self
                    .repo
                    .tree_entries(&target)?
                    .into_iter()
                    .map(|e| e.path)
                    .collect();
                if self.ctx.dry_run {
                    self.ctx
                        .log
                        .dry_run(&format!("would check out {target} as '{branch}'"));
                } else {
                    self.repo.create_branch(&branch, Some(&target))?;
                    self.repo.checkout_force(&branch)?;
                }
                Ok(UpdateReport {
                    branch,
                    changed,
                    resolution,
                    up_to_date: false,
                })
            }
            PushPlan::Behind { behind } => {
                self.ctx.log.stage(&format!("Updating '{branch}'"));
                let resolution = self
                    .resolver()
                    .resolve(&target, &format!("update {branch}"))?;
                let changed = self.repo.changed_between("HEAD", &target)?;
                if self.ctx.dry_run {
                    self.ctx.log.dry_run(&format!(
                        "would fast-forward '{branch}' by {behind} commit(s)"
                    ));
                } else {
                    self.repo.merge_ff_only(&target)?;
                }
                Ok(UpdateReport {
                    branch,
                    changed,
                    resolution,
                    up_to_date: false,
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn default_message_names_host() {
        let msg = default_backup_message();
        assert!(msg.starts_with("Backup from "));
        assert!(msg.contains(" at "));
    }

    #[test]
    fn state_and_file_status_render() {
        assert_eq!(RepoState::Dirty.to_string(), "local changes");
        assert_eq!(FileSyncStatus::NotInitialized.to_string(), "not-initialized");
        assert_eq!(FileSyncStatus::UpToDate.to_string(), "up-to-date");
    }
}
