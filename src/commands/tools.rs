//! Command: `tools status|install|config`.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, ToolsCommand, ToolsOpts};
use crate::config::expand_home;
use crate::logging::TaskStatus;
use crate::tools::{InstallOutcome, ToolRegistry, ToolStatus};

/// Run `tools`.
///
/// # Errors
///
/// Returns an error if a requested tool is undeclared, any install fails,
/// or `tools status` finds missing tools.
pub fn run(setup: &CommandSetup, global: &GlobalOpts, command: &ToolsCommand) -> Result<()> {
    match command {
        ToolsCommand::Status(opts) => status(setup, global, opts),
        ToolsCommand::Install { select, force } => install(setup, global, select, *force),
        ToolsCommand::Config { name } => {
            let Some(tool) = setup.ctx.config.tools.get(name) else {
                anyhow::bail!("tool '{name}' is not declared under tools");
            };
            let Some(file) = tool.config_files.first() else {
                anyhow::bail!("tool '{name}' declares no config_files");
            };
            super::config::open_in_editor(setup, &expand_home(file, &setup.ctx.home))
        }
    }
}

fn select(setup: &CommandSetup, global: &GlobalOpts, opts: &ToolsOpts) -> Result<Vec<String>> {
    let profile = setup.profile(global)?;
    if let Some(p) = profile.as_ref().filter(|_| !opts.all && opts.names.is_empty()) {
        setup.ctx.log.debug(&format!("tools of profile '{}'", p.name));
    }
    Ok(ToolRegistry::new(&setup.ctx).select(&opts.names, profile.as_ref(), opts.all)?)
}

fn status(setup: &CommandSetup, global: &GlobalOpts, opts: &ToolsOpts) -> Result<()> {
    let log = &*setup.ctx.log;
    let names = select(setup, global, opts)?;
    if names.is_empty() {
        log.info("no tools selected");
        return Ok(());
    }
    log.stage("Checking tools");
    let statuses = ToolRegistry::new(&setup.ctx).status(names);
    for s in &statuses {
        log.info(&render_status(s));
    }
    let missing = statuses.iter().filter(|s| !s.installed).count();
    if missing > 0 {
        anyhow::bail!("{missing} tool(s) not installed; run `freckle tools install`");
    }
    Ok(())
}

fn render_status(s: &ToolStatus) -> String {
    let mark = if s.installed { "✓" } else { "✗" };
    let mut line = format!("{mark} {}", s.name);
    if let Some(v) = &s.version {
        line.push_str(&format!(" ({v})"));
    }
    if !s.installed {
        let methods: Vec<String> = s.methods.iter().map(ToString::to_string).collect();
        if methods.is_empty() {
            line.push_str(" - no usable install method");
        } else {
            line.push_str(&format!(" - via {}", methods.join(", ")));
        }
    }
    line
}

fn install(setup: &CommandSetup, global: &GlobalOpts, opts: &ToolsOpts, force: bool) -> Result<()> {
    let log = &*setup.ctx.log;
    let names = select(setup, global, opts)?;
    if names.is_empty() {
        log.info("no tools selected");
        return Ok(());
    }
    log.stage(&format!("Installing {} tool(s)", names.len()));
    for (name, result) in ToolRegistry::new(&setup.ctx).install_many(names, force) {
        match result {
            Ok(InstallOutcome::AlreadyInstalled { version }) => log.record_task(
                &name,
                TaskStatus::Skipped,
                Some(version.as_deref().unwrap_or("already installed")),
            ),
            Ok(InstallOutcome::Installed { via, version }) => {
                let detail = version.map_or_else(|| format!("via {via}"), |v| format!("{v} via {via}"));
                log.record_task(&name, TaskStatus::Ok, Some(&detail));
            }
            Ok(InstallOutcome::WouldInstall(cmd)) => {
                log.record_task(&name, TaskStatus::DryRun, Some(&cmd.to_string()));
            }
            Err(e) => {
                log.error(&e.to_string());
                log.record_task(&name, TaskStatus::Failed, e.hint().as_deref());
            }
        }
    }
    super::finish_batch(&setup.log)
}
