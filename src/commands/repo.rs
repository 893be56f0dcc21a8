//! Commands: `init`, `sync`, `backup`, `update`, `status`.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::{BackupOpts, GlobalOpts, InitOpts, StatusOpts};
use crate::logging::Log;
use crate::manager::paths::home_relative;
use crate::manager::{
    CloneReport, DotfilesManager, PushOutcome, RepoState, StatusReport, SyncOutcome,
};
use crate::repo::PushPlan;
use crate::restore::Resolution;

/// Run `init`.
///
/// # Errors
///
/// Returns an error if cloning or creating the repository fails.
pub fn init(setup: &CommandSetup, opts: &InitOpts) -> Result<()> {
    let manager = DotfilesManager::new(&setup.ctx);
    let outcome = manager.init(opts.repo_url.as_deref())?;
    report_sync(&*setup.ctx.log, &outcome);
    Ok(())
}

/// Run `sync`.
///
/// # Errors
///
/// Returns an error if no repository URL is configured or git fails.
pub fn sync(setup: &CommandSetup) -> Result<()> {
    let manager = DotfilesManager::new(&setup.ctx);
    let outcome = manager.sync()?;
    report_sync(&*setup.ctx.log, &outcome);
    Ok(())
}

fn report_sync(log: &dyn Log, outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Planned(action) => log.dry_run(&format!("would {action}")),
        SyncOutcome::Cloned(report) => report_clone(log, report),
        SyncOutcome::Created { branch } => {
            log.info(&format!("new repository on '{branch}'"));
            log.info("track files with `freckle add <file>` and save them with `freckle backup`");
        }
        SyncOutcome::AlreadyInitialized => {
            log.info("repository already exists; run `freckle sync` to check its state");
        }
        SyncOutcome::Existing(status) => report_status(log, status, None),
    }
}

fn report_clone(log: &dyn Log, report: &CloneReport) {
    if let Some(note) = &report.note {
        log.info(note);
    }
    report_resolution(log, &report.resolution);
    log.info(&format!("checked out '{}'", report.branch));
}

/// Tell the user where moved files went.
pub(super) fn report_resolution(log: &dyn Log, resolution: &Resolution) {
    if let Some(point) = &resolution.point {
        for file in &resolution.moved {
            log.info(&format!("moved ~/{file}"));
        }
        log.info(&format!(
            "restore with `freckle restore {}`",
            point.name
        ));
    } else if !resolution.moved.is_empty() {
        for file in &resolution.moved {
            log.dry_run(&format!("would move ~/{file} to a restore point"));
        }
    }
}

/// Run `backup`.
///
/// # Errors
///
/// Returns an error if committing fails, or if the push was blocked or
/// failed; the local commit is kept either way.
pub fn backup(setup: &CommandSetup, opts: &BackupOpts) -> Result<()> {
    let log = &*setup.ctx.log;
    let manager = DotfilesManager::new(&setup.ctx);
    log.stage("Backing up");
    let report = manager.backup(opts.message.as_deref(), !opts.no_push)?;
    if report.committed {
        log.info(&format!("\"{}\"", report.message));
    }
    match report.push {
        PushOutcome::Skipped => {}
        PushOutcome::NoRemote => log.warn("no remote configured; backup is local only"),
        PushOutcome::Done(PushPlan::UpToDate) => log.info("remote already up to date"),
        PushOutcome::Done(PushPlan::SetUpstream) => log.info("pushed new branch to origin"),
        PushOutcome::Done(PushPlan::FastForward { ahead }) => {
            log.info(&format!("pushed {ahead} commit(s)"));
        }
        PushOutcome::Done(_) => log.info("pushed"),
        PushOutcome::Blocked(plan) => {
            let reason = plan
                .blocked_reason()
                .unwrap_or_else(|| format!("{plan:?}"));
            anyhow::bail!("committed locally but not pushed: {reason}");
        }
        PushOutcome::Failed(reason) => {
            anyhow::bail!("committed locally but the push failed: {reason}");
        }
    }
    Ok(())
}

/// Run `update`.
///
/// # Errors
///
/// Returns an error if the branch diverged, there is no remote, or files
/// could not be moved aside.
pub fn update(setup: &CommandSetup) -> Result<()> {
    let log = &*setup.ctx.log;
    let report = DotfilesManager::new(&setup.ctx).update()?;
    if report.up_to_date {
        log.info(&format!("'{}' is up to date", report.branch));
        return Ok(());
    }
    report_resolution(log, &report.resolution);
    for file in &report.changed {
        log.debug(&format!("updated ~/{file}"));
    }
    let verb = if setup.ctx.dry_run { "would update" } else { "updated" };
    log.info(&format!("{verb} {} file(s) on '{}'", report.changed.len(), report.branch));
    Ok(())
}

/// Run `status`.
///
/// # Errors
///
/// Returns an error if git inspection fails.
pub fn status(setup: &CommandSetup, global: &GlobalOpts, opts: &StatusOpts) -> Result<()> {
    let log = &*setup.ctx.log;
    let manager = DotfilesManager::new(&setup.ctx);
    if let Some(file) = &opts.file {
        let cwd = std::env::current_dir()?;
        let rel = home_relative(file, &setup.ctx.home, &cwd)?;
        let state = manager.file_status(&rel)?;
        log.info(&format!("~/{rel}: {state}"));
        return Ok(());
    }
    let report = manager.status(!opts.offline)?;
    report_status(log, &report, Some(&setup.expected_branch(global)));
    Ok(())
}

fn report_status(log: &dyn Log, report: &StatusReport, expected: Option<&str>) {
    if report.state == RepoState::Uninitialized {
        log.warn("dotfiles repository not initialized; run `freckle init` or `freckle sync`");
        return;
    }
    let expected = expected.unwrap_or(&report.expected_branch);
    match (&report.branch, &report.profile) {
        (Some(b), Some(p)) => log.info(&format!("branch: {b} (profile {p})")),
        (Some(b), None) => log.info(&format!("branch: {b}")),
        (None, _) => log.warn("HEAD is detached"),
    }
    if let Some(b) = &report.branch
        && b != expected
    {
        log.warn(&format!("expected branch '{expected}'"));
    }
    log.info(&format!("state: {}", report.state));

    if !report.has_remote {
        log.info("remote: none");
    } else if let Some(err) = &report.fetch_error {
        log.warn(&format!("could not fetch: {err}"));
    }
    if report.has_remote {
        match PushPlan::from_state(report.refs) {
            PushPlan::NoCommits => log.info("remote: no local commits yet"),
            PushPlan::SetUpstream => log.info("remote: branch not pushed yet"),
            PushPlan::UpToDate => log.info("remote: up to date"),
            PushPlan::FastForward { ahead } => log.info(&format!("remote: {ahead} commit(s) to push")),
            PushPlan::Behind { behind } => {
                log.info(&format!("remote: {behind} commit(s) to pull; run `freckle update`"));
            }
            PushPlan::Diverged { ahead, behind } => {
                log.warn(&format!("remote: diverged ({ahead} ahead, {behind} behind)"));
            }
        }
    }

    for change in &report.changes {
        log.info(&format!("{:>9}: ~/{}", change.state, change.path));
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;
    use crate::repo::{FileState, RefState, StatusEntry};

    fn report() -> StatusReport {
        StatusReport {
            state: RepoState::Dirty,
            branch: Some("work".to_string()),
            expected_branch: "main".to_string(),
            profile: Some("work".to_string()),
            changes: vec![StatusEntry {
                path: ".zshrc".to_string(),
                state: FileState::Modified,
            }],
            refs: RefState {
                local: true,
                remote: true,
                ahead: 2,
                behind: 0,
            },
            has_remote: true,
            fetch_error: None,
        }
    }

    #[test]
    fn status_lines() {
        let log = MemoryLog::default();
        report_status(&log, &report(), Some("work"));
        insta::assert_snapshot!(log.lines().join("\n"), @r"
        info: branch: work (profile work)
        info: state: local changes
        info: remote: 2 commit(s) to push
        info:  modified: ~/.zshrc
        ");
    }

    #[test]
    fn status_warns_about_unexpected_branch() {
        let log = MemoryLog::default();
        report_status(&log, &report(), None);
        assert!(log.contains("warn: expected branch 'main'"));
    }

    #[test]
    fn uninitialized_status_only_warns() {
        let log = MemoryLog::default();
        let r = StatusReport {
            state: RepoState::Uninitialized,
            ..report()
        };
        report_status(&log, &r, None);
        assert_eq!(log.lines().len(), 1);
        assert!(log.contains("not initialized"));
    }
}
