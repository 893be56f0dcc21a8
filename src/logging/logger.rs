//! The console/file logger and the end-of-run summary for batch commands.
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{Log, TaskEntry, TaskStatus};
use super::utils::log_file_path;

/// Emits through the global `tracing` subscriber and collects per-item
/// results (tools, branches, doctor checks) for [`print_summary`](Self::print_summary).
#[derive(Debug)]
pub struct Logger {
    tasks: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for one invocation of `command`. The file itself is written by
    /// the subscriber's file layer; this only remembers where it is.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Where this run's log file lives, if the cache dir is usable.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Results recorded so far, in recording order.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.task_entries()
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count()
    }

    /// Log the per-item summary followed by the totals and the log file.
    /// Does nothing when no item was recorded.
    pub fn print_summary(&self) {
        let tasks = self.task_entries();
        if tasks.is_empty() {
            return;
        }
        tracing::info!(target: STAGE_TARGET, "Summary");
        for line in summary_lines(&tasks) {
            tracing::info!("{line}");
        }
        if let Some(path) = &self.log_file {
            tracing::info!("\x1b[2mlog: {}\x1b[0m", path.display());
        }
    }
}

/// Icon and colour for a status.
const fn badge(status: TaskStatus) -> (&'static str, &'static str) {
    match status {
        TaskStatus::Ok => ("✓", "\x1b[32m"),
        TaskStatus::Skipped => ("○", "\x1b[33m"),
        TaskStatus::DryRun => ("~", "\x1b[37m"),
        TaskStatus::Failed => ("✗", "\x1b[31m"),
    }
}

/// One line per item, then a totals line naming only the non-zero counts.
fn summary_lines(tasks: &[TaskEntry]) -> Vec<String> {
    let mut lines: Vec<String> = tasks
        .iter()
        .map(|task| {
            let (icon, colour) = badge(task.status);
            let mut line = format!("{colour}{icon} {}", task.name);
            if let Some(msg) = &task.message {
                let _ = write!(line, " ({msg})");
            }
            line.push_str("\x1b[0m");
            line
        })
        .collect();

    let count = |s: TaskStatus| tasks.iter().filter(|t| t.status == s).count();
    let parts: Vec<String> = [
        (TaskStatus::Ok, "ok"),
        (TaskStatus::Skipped, "skipped"),
        (TaskStatus::DryRun, "planned"),
        (TaskStatus::Failed, "failed"),
    ]
    .into_iter()
    .filter_map(|(status, label)| {
        let n = count(status);
        (n > 0).then(|| format!("{}{n} {label}\x1b[0m", badge(status).1))
    })
    .collect();
    lines.push(format!("{} total: {}", tasks.len(), parts.join(", ")));
    lines
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        self.tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(TaskEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    fn entry(name: &str, status: TaskStatus, message: Option<&str>) -> TaskEntry {
        TaskEntry {
            name: name.to_string(),
            status,
            message: message.map(String::from),
        }
    }

    #[test]
    fn summary_lists_items_then_non_zero_totals() {
        let lines: Vec<String> = summary_lines(&[
            entry("bat", TaskStatus::Ok, Some("bat 0.24.0 via brew")),
            entry("fd", TaskStatus::Failed, Some("brew exited with status 1")),
            entry("rg", TaskStatus::Skipped, Some("ripgrep 14.1.0")),
        ])
        .iter()
        .map(|l| crate::logging::utils::strip_ansi(l))
        .collect();
        insta::assert_snapshot!(lines.join("\n"), @r"
        ✓ bat (bat 0.24.0 via brew)
        ✗ fd (brew exited with status 1)
        ○ rg (ripgrep 14.1.0)
        3 total: 1 ok, 1 skipped, 1 failed
        ");
    }

    #[test]
    fn failure_count_counts_only_failures() {
        let (log, _tmp, _guard) = isolated_logger();
        assert_eq!(log.failure_count(), 0);
        log.record_task("main", TaskStatus::Ok, None);
        log.record_task("work", TaskStatus::Failed, Some("push blocked"));
        log.record_task("laptop", TaskStatus::DryRun, None);
        assert_eq!(log.failure_count(), 1);
        assert_eq!(log.task_entries()[1].message.as_deref(), Some("push blocked"));
    }

    #[test]
    fn every_level_reaches_the_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.stage("Fetching");
        log.debug("git fetch --quiet --prune origin");
        log.dry_run("would fast-forward 'main' by 2 commit(s)");
        log.warn("remote is ahead");
        log.error("push rejected");
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("==> Fetching"));
        assert!(contents.contains("[debug] git fetch --quiet --prune origin"));
        assert!(contents.contains("[dry run] would fast-forward 'main' by 2 commit(s)"));
        assert!(contents.contains("[warn] remote is ahead"));
        assert!(contents.contains("[error] push rejected"));
    }
}
