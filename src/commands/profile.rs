//! Command: `profile list|switch|create|delete|diff`.
use anyhow::Result;

use super::CommandSetup;
use super::repo::report_resolution;
use crate::cli::ProfileCommand;
use crate::logging::Log;
use crate::manager::DotfilesManager;
use crate::manager::profile::{ProfileChange, ProfileEntry};

/// Run `profile`.
///
/// # Errors
///
/// Returns an error if the profile is unknown or git fails.
pub fn run(setup: &CommandSetup, command: &ProfileCommand) -> Result<()> {
    let log = &*setup.ctx.log;
    let manager = DotfilesManager::new(&setup.ctx);
    match command {
        ProfileCommand::List => {
            let entries = manager.list_profiles()?;
            if entries.is_empty() {
                log.info("no profiles declared; add one with `freckle profile create <name>`");
            }
            for entry in &entries {
                log.info(&render_entry(entry));
            }
            Ok(())
        }
        ProfileCommand::Switch { name } => {
            let report = manager.switch_profile(name)?;
            if report.already_current {
                log.info(&format!("already on '{}'", report.branch));
                return Ok(());
            }
            report_resolution(log, &report.resolution);
            if !setup.ctx.dry_run {
                log.info(&format!("switched to '{}'", report.branch));
            }
            Ok(())
        }
        ProfileCommand::Create { name, from } => {
            let change = manager.create_profile(name, from.as_deref())?;
            report_change(log, &change);
            super::finish_batch(&setup.log)
        }
        ProfileCommand::Delete { name, remote } => {
            let change = manager.delete_profile(name, *remote)?;
            report_change(log, &change);
            super::finish_batch(&setup.log)
        }
        ProfileCommand::Diff { name } => {
            let files = manager.profile_diff(name)?;
            if files.is_empty() {
                log.info(&format!("no differences with '{name}'"));
            }
            for file in files {
                log.info(&format!("~/{file}"));
            }
            Ok(())
        }
    }
}

fn render_entry(entry: &ProfileEntry) -> String {
    let marker = if entry.current { "*" } else { " " };
    let location = match (entry.local, entry.remote) {
        (true, true) => "local+remote",
        (true, false) => "local",
        (false, true) => "remote",
        (false, false) => "no branch",
    };
    let mut line = format!("{marker} {} [{}, {location}]", entry.profile.name, entry.profile.branch);
    if let Some(description) = &entry.profile.description {
        line.push_str(" - ");
        line.push_str(description);
    }
    line
}

fn report_change(log: &dyn Log, change: &ProfileChange) {
    if let Some(warning) = &change.remote_warning {
        log.warn(&format!("remote: {warning}"));
    }
    if let Some(report) = &change.propagated {
        log.debug(&format!(
            "config propagated to {} branch(es)",
            report.branches.len()
        ));
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::profiles::Profile;

    #[test]
    fn entries_render_with_location() {
        let entry = ProfileEntry {
            profile: Profile {
                name: "work".to_string(),
                branch: "work".to_string(),
                description: Some("Laptop".to_string()),
                tools: Vec::new(),
            },
            current: true,
            local: true,
            remote: false,
        };
        assert_eq!(render_entry(&entry), "* work [work, local] - Laptop");
        let other = ProfileEntry {
            current: false,
            local: false,
            remote: false,
            ..entry
        };
        assert_eq!(render_entry(&other), "  work [work, no branch] - Laptop");
    }
}
