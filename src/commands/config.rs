//! Command: `config open|check|propagate`.
use std::path::Path;

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::{ConfigCommand, PropagateOpts};
use crate::manager::DotfilesManager;
use crate::manager::propagate::BranchOutcome;

/// Written by `config open` when no config file exists yet.
const STARTER_CONFIG: &str = "\
dotfiles:
  repo_url: null
  branch: main
  dir: ~/.dotfiles

profiles:
  main:
    description: Default profile
    tools: []

tools: {}
";

/// Run `config`.
///
/// # Errors
///
/// Returns an error if the editor fails, validation finds problems, or any
/// branch fails to receive the propagated files.
pub fn run(setup: &CommandSetup, command: &ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Open => open(setup),
        ConfigCommand::Check => check(setup),
        ConfigCommand::Propagate(opts) => propagate(setup, opts),
    }
}

fn open(setup: &CommandSetup) -> Result<()> {
    let path = setup.ctx.config_path();
    if !path.exists() {
        if setup.ctx.dry_run {
            setup
                .ctx
                .log
                .dry_run(&format!("would create {}", path.display()));
            return Ok(());
        }
        std::fs::write(&path, STARTER_CONFIG)
            .with_context(|| format!("writing {}", path.display()))?;
        setup.ctx.log.info(&format!("created {}", path.display()));
    }
    open_in_editor(setup, &path)
}

/// Open `path` in `$VISUAL`/`$EDITOR` (fallback `vi`), attached to the
/// terminal.
///
/// # Errors
///
/// Returns an error if the editor cannot be started or exits non-zero.
pub fn open_in_editor(setup: &CommandSetup, path: &Path) -> Result<()> {
    let editor = ["VISUAL", "EDITOR"]
        .iter()
        .find_map(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| "vi".to_string());
    let mut words = editor.split_whitespace();
    let program = words.next().unwrap_or("vi");
    let path_str = path.to_string_lossy();
    let mut args: Vec<&str> = words.collect();
    args.push(&path_str);
    if setup.ctx.dry_run {
        setup
            .ctx
            .log
            .dry_run(&format!("would run {program} {}", args.join(" ")));
        return Ok(());
    }
    let code = setup
        .ctx
        .executor
        .run_interactive(&setup.ctx.home, program, &args, &[])?;
    if code != 0 {
        anyhow::bail!("{program} exited with status {code}");
    }
    Ok(())
}

fn check(setup: &CommandSetup) -> Result<()> {
    let log = &*setup.ctx.log;
    let config = &setup.ctx.config;
    let Some(source) = &config.source else {
        anyhow::bail!(
            "no config file at {}; run `freckle config open` to create one",
            setup.ctx.config_path().display()
        );
    };
    log.stage(&format!("Checking {}", source.display()));
    let warnings = config.validate();
    if warnings.is_empty() {
        log.info(&format!(
            "ok: {} profile(s), {} tool(s)",
            config.profiles.len(),
            config.tools.len()
        ));
        return Ok(());
    }
    for w in &warnings {
        log.warn(&w.to_string());
    }
    anyhow::bail!("{} problem(s) in {}", warnings.len(), source.display())
}

fn propagate(setup: &CommandSetup, opts: &PropagateOpts) -> Result<()> {
    let log = &*setup.ctx.log;
    let cwd = std::env::current_dir()?;
    log.stage("Propagating");
    let report = DotfilesManager::new(&setup.ctx).propagate(
        &opts.files,
        &cwd,
        &opts.branches,
        opts.push,
        opts.force,
    )?;
    let committed = report
        .branches
        .iter()
        .filter(|(_, o)| *o == BranchOutcome::Committed)
        .count();
    log.debug(&format!(
        "{} to {committed} of {} branch(es)",
        report.files.join(", "),
        report.branches.len()
    ));
    super::finish_batch(&setup.log)
}
