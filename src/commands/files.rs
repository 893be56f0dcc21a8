//! Commands: `add`, `remove`, `history`, `diff`, `log`.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::{AddOpts, HistoryOpts, RemoveOpts};
use crate::manager::DotfilesManager;
use crate::manager::paths::home_relative;

/// Run `add`.
///
/// # Errors
///
/// Returns an error if a secret is detected, a path is outside home, or
/// staging fails.
pub fn add(setup: &CommandSetup, opts: &AddOpts) -> Result<()> {
    let log = &*setup.ctx.log;
    let cwd = std::env::current_dir()?;
    let report = DotfilesManager::new(&setup.ctx).add(&opts.files, &cwd, opts.force)?;
    if report.added.is_empty() {
        anyhow::bail!("no files to add");
    }
    if !setup.ctx.dry_run {
        for file in &report.added {
            log.info(&format!("tracking ~/{file}"));
        }
        log.info("run `freckle backup` to commit");
    }
    Ok(())
}

/// Run `remove`.
///
/// # Errors
///
/// Returns an error if a path is not tracked.
pub fn remove(setup: &CommandSetup, opts: &RemoveOpts) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let removed = DotfilesManager::new(&setup.ctx).remove(&opts.files, &cwd, opts.delete)?;
    if !setup.ctx.dry_run {
        let what = if opts.delete { "deleted" } else { "untracked" };
        for file in &removed {
            setup.ctx.log.info(&format!("{what} ~/{file}"));
        }
    }
    Ok(())
}

/// Run `history`.
///
/// # Errors
///
/// Returns an error if the repository is missing or the log cannot be read.
pub fn history(setup: &CommandSetup, opts: &HistoryOpts) -> Result<()> {
    let log = &*setup.ctx.log;
    let repo = setup.ctx.repo();
    repo.ensure_exists()?;
    let cwd = std::env::current_dir()?;
    let rel = home_relative(&opts.file, &setup.ctx.home, &cwd)?;
    let commits = repo.log_summary("HEAD", Some(&rel), opts.limit)?;
    if commits.is_empty() {
        log.info(&format!("no commits touch ~/{rel}"));
        return Ok(());
    }
    log.stage(&format!("History of ~/{rel}"));
    for c in commits {
        log.info(&format!("{} {} {}", c.hash, c.date, c.subject));
    }
    Ok(())
}

/// Run `git <subcommand> <args>` on the terminal against the bare repo.
///
/// # Errors
///
/// Returns an error if git cannot be run or exits non-zero.
pub fn passthrough(setup: &CommandSetup, subcommand: &str, args: &[String]) -> Result<()> {
    let repo = setup.ctx.repo();
    repo.ensure_exists()?;
    let mut full = vec![subcommand];
    full.extend(args.iter().map(String::as_str));
    let code = repo.passthrough(&full)?;
    if code != 0 {
        anyhow::bail!("git {subcommand} exited with status {code}");
    }
    Ok(())
}
