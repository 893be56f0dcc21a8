//! Subcommand orchestration: build a [`Context`], call the manager, report.
pub mod config;
pub mod doctor;
pub mod files;
pub mod profile;
pub mod repo;
pub mod restore;
pub mod schedule;
pub mod tools;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::config::profiles::{self, Profile};
use crate::context::Context;
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::platform::Platform;

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// Context handed to the manager and registry.
    pub ctx: Context,
    /// The concrete logger, for the summary.
    pub log: Arc<Logger>,
}

impl CommandSetup {
    /// Resolve the home directory, load the config and detect the platform.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined or the config
    /// file is malformed.
    pub fn init(global: &GlobalOpts, log: &Arc<Logger>) -> Result<Self> {
        let home = resolve_home(global)?;
        let config = Config::load(&home, &local_user())?;
        match &config.source {
            Some(path) => log.debug(&format!("config: {}", path.display())),
            None => log.debug("no config file; using defaults"),
        }
        let platform = Platform::detect();
        log.debug(&format!("platform: {}", platform.os));

        let ctx = Context::new(
            Arc::new(config),
            Arc::new(platform),
            Arc::clone(log) as Arc<dyn Log>,
            home,
            Arc::new(SystemExecutor),
        )
        .with_dry_run(global.dry_run)
        .with_parallel(global.parallel);
        Ok(Self {
            ctx,
            log: Arc::clone(log),
        })
    }

    /// The profile selected with `--profile`, else the one whose branch is
    /// checked out.
    ///
    /// # Errors
    ///
    /// Returns an error if `--profile` names an undeclared profile.
    pub fn profile(&self, global: &GlobalOpts) -> Result<Option<Profile>> {
        if let Some(name) = &global.profile {
            return Ok(Some(profiles::resolve(&self.ctx.config, name)?));
        }
        Ok(self
            .ctx
            .repo()
            .current_branch()
            .ok()
            .and_then(|b| profiles::for_branch(&self.ctx.config, &b)))
    }

    /// Branch the work tree should be on: the `--profile` branch, the current
    /// branch when it belongs to a profile, else `dotfiles.branch`.
    #[must_use]
    pub fn expected_branch(&self, global: &GlobalOpts) -> String {
        let config = &self.ctx.config;
        if let Some(name) = &global.profile {
            return config.profile_branch(name);
        }
        self.ctx
            .repo()
            .current_branch()
            .ok()
            .filter(|b| profiles::for_branch(config, b).is_some())
            .unwrap_or_else(|| config.dotfiles.branch.clone())
    }
}

/// Home directory: `--home`, then `$HOME`, then the platform default.
///
/// # Errors
///
/// Returns an error if none of them is available.
pub fn resolve_home(global: &GlobalOpts) -> Result<PathBuf> {
    if let Some(home) = &global.home {
        return Ok(home.clone());
    }
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .context("cannot determine the home directory; pass --home")
}

fn local_user() -> String {
    std::env::var("USER")
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "user".to_string())
}

/// Print the summary and fail if any recorded task failed.
///
/// # Errors
///
/// Returns an error if one or more tasks recorded a failure.
pub fn finish_batch(log: &Logger) -> Result<()> {
    log.print_summary();
    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    Ok(())
}

/// Run one parsed subcommand.
///
/// # Errors
///
/// Returns whatever the subcommand returns.
pub fn dispatch(command: &Command, global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    if let Command::Version = command {
        version::run(log.as_ref());
        return Ok(());
    }
    let setup = CommandSetup::init(global, log)?;
    match command {
        Command::Init(opts) => repo::init(&setup, opts),
        Command::Sync => repo::sync(&setup),
        Command::Backup(opts) => repo::backup(&setup, opts),
        Command::Update => repo::update(&setup),
        Command::Status(opts) => repo::status(&setup, global, opts),
        Command::Doctor => doctor::run(&setup, global),
        Command::Add(opts) => files::add(&setup, opts),
        Command::Remove(opts) => files::remove(&setup, opts),
        Command::History(opts) => files::history(&setup, opts),
        Command::Diff(opts) => files::passthrough(&setup, "diff", &opts.args),
        Command::Log(opts) => files::passthrough(&setup, "log", &opts.args),
        Command::Config(sub) => config::run(&setup, sub),
        Command::Profile(sub) => profile::run(&setup, sub),
        Command::Tools(sub) => tools::run(&setup, global, sub),
        Command::Restore(opts) => restore::run(&setup, opts),
        Command::Schedule(opts) => schedule::run(&setup, opts),
        Command::Version => Ok(()),
    }
}
