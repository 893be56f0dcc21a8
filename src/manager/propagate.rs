//! Copy shared config files onto every profile branch.
//!
//! Other branches are updated with plumbing (scratch index, `commit-tree`,
//! `update-ref`), so neither the work tree nor the real index changes.
use std::path::Path;

use super::{DotfilesManager, paths};
use crate::error::{ConfigError, FreckleError};
use crate::logging::TaskStatus;

/// Result for one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome {
    /// A commit was added (and pushed, when requested).
    Committed,
    /// The branch already had identical content.
    Unchanged,
    /// Dry run: a commit would be added.
    Planned,
    /// Committing or pushing failed; other branches were still processed.
    Failed(String),
}

/// Per-branch results of a propagate run.
#[derive(Debug, Clone, Default)]
pub struct PropagateReport {
    /// Home-relative files that were propagated.
    pub files: Vec<String>,
    /// Branch name and its outcome, in processing order.
    pub branches: Vec<(String, BranchOutcome)>,
}

impl PropagateReport {
    /// Number of branches that failed.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.branches
            .iter()
            .filter(|(_, o)| matches!(o, BranchOutcome::Failed(_)))
            .count()
    }
}

impl DotfilesManager<'_> {
    /// Branches of declared profiles that exist locally or on the remote,
    /// plus the current branch; sorted.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::Git`] if branches cannot be listed.
    pub fn profile_branches(&self) -> Result<Vec<String>, FreckleError> {
        let available = self.repo.list_branches()?;
        let mut branches: Vec<String> = self
            .ctx
            .config
            .profile_names()
            .iter()
            .map(|p| self.ctx.config.profile_branch(p))
            .filter(|b| available.contains(b))
            .collect();
        if let Ok(current) = self.repo.current_branch() {
            branches.push(current);
        }
        branches.sort();
        branches.dedup();
        Ok(branches)
    }

    /// Commit the work-tree content of `raw` files onto `branches` (all
    /// profile branches when empty). The files pass the same secret scan as
    /// `add` unless `force`. One branch failing does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError`] only for problems that affect every branch:
    /// no repository, a path outside home, a missing file, or a file the
    /// secret scan refuses.
    pub fn propagate(
        &self,
        raw: &[String],
        cwd: &Path,
        branches: &[String],
        push: bool,
        force: bool,
    ) -> Result<PropagateReport, FreckleError> {
        self.repo.ensure_exists()?;
        let files = paths::home_relative_all(raw, &self.ctx.home, cwd)?;
        self.secret_gate(&files, force)?;
        let branches = if branches.is_empty() {
            self.profile_branches()?
        } else {
            branches.to_vec()
        };
        let source = self
            .repo
            .current_branch()
            .unwrap_or_else(|_| "HEAD".to_string());
        let message = format!("Propagate {} from {source}", files.join(", "));
        self.propagate_files(&files, &branches, &message, push)
    }

    pub(crate) fn propagate_files(
        &self,
        files: &[String],
        branches: &[String],
        message: &str,
        push: bool,
    ) -> Result<PropagateReport, FreckleError> {
        if let Some(missing) = files.iter().find(|f| !self.ctx.home.join(f).is_file()) {
            return Err(ConfigError::Invalid(format!("~/{missing} does not exist")).into());
        }
        let current = self.repo.current_branch().ok();
        let push = push && self.repo.has_remote();
        let mut report = PropagateReport {
            files: files.to_vec(),
            branches: Vec::with_capacity(branches.len()),
        };

        for branch in branches {
            let outcome = if self.ctx.dry_run {
                BranchOutcome::Planned
            } else {
                let is_current = current.as_deref() == Some(branch.as_str());
                self.propagate_one(branch, is_current, files, message, push)
                    .unwrap_or_else(|e| BranchOutcome::Failed(e.to_string()))
            };
            match &outcome {
                BranchOutcome::Committed => self.ctx.log.record_task(branch, TaskStatus::Ok, None),
                BranchOutcome::Unchanged => {
                    self.ctx
                        .log
                        .record_task(branch, TaskStatus::Skipped, Some("already up to date"));
                }
                BranchOutcome::Planned => {
                    self.ctx.log.dry_run(&format!(
                        "would commit {} file(s) to '{branch}'",
                        files.len()
                    ));
                    self.ctx.log.record_task(branch, TaskStatus::DryRun, None);
                }
                BranchOutcome::Failed(reason) => {
                    self.ctx.log.warn(&format!("{branch}: {reason}"));
                    self.ctx
                        .log
                        .record_task(branch, TaskStatus::Failed, Some(reason));
                }
            }
            report.branches.push((branch.clone(), outcome));
        }
        Ok(report)
    }

    fn propagate_one(
        &self,
        branch: &str,
        is_current: bool,
        files: &[String],
        message: &str,
        push: bool,
    ) -> Result<BranchOutcome, FreckleError> {
        let committed = if is_current {
            self.repo.add(files)?;
            self.repo.commit_paths(message, files)?
        } else {
            if !self.repo.branch_exists(branch) && self.repo.remote_branch_exists(branch) {
                self.repo
                    .create_branch(branch, Some(&format!("origin/{branch}")))?;
            }
            let mut any = false;
            for file in files {
                any |= self.repo.commit_file_to_branch(branch, file, message)?;
            }
            any
        };
        if committed && push {
            let plan = self.repo.push(branch)?;
            if let Some(reason) = plan.blocked_reason() {
                return Ok(BranchOutcome::Failed(format!(
                    "committed locally but not pushed: {reason}"
                )));
            }
        }
        Ok(if committed {
            BranchOutcome::Committed
        } else {
            BranchOutcome::Unchanged
        })
    }
}
