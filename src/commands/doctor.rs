//! Command: `doctor`.
use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::logging::TaskStatus;
use crate::manager::DotfilesManager;
use crate::manager::doctor::{DoctorReport, Severity};

/// Run `doctor`: log every finding and fail only when an issue was found.
///
/// # Errors
///
/// Returns an error if any finding has [`Severity::Issue`].
pub fn run(setup: &CommandSetup, global: &GlobalOpts) -> Result<()> {
    let log = &*setup.ctx.log;
    log.stage("Checking freckle");
    let report = DotfilesManager::new(&setup.ctx).doctor(&setup.expected_branch(global));
    record(setup, &report);
    setup.log.print_summary();
    let issues = report
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Issue)
        .count();
    if issues > 0 {
        anyhow::bail!("{issues} issue(s) found");
    }
    Ok(())
}

fn record(setup: &CommandSetup, report: &DoctorReport) {
    let log = &*setup.ctx.log;
    for passed in &report.passed {
        log.record_task(passed, TaskStatus::Ok, None);
    }
    for finding in &report.findings {
        let status = match finding.severity {
            Severity::Issue => TaskStatus::Failed,
            Severity::Warning => TaskStatus::Skipped,
        };
        let name = format!("{}: {}", finding.check, finding.message);
        log.record_task(&name, status, finding.suggestion.as_deref());
    }
}
