//! The [`Log`] seam and the per-item results batch commands collect.

/// Outcome of one item of a batch: a tool install, a branch in `propagate`,
/// a doctor check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Tool, branch or check name.
    pub name: String,
    /// How it ended.
    pub status: TaskStatus,
    /// Version, skip reason or error text.
    pub message: Option<String>,
}

/// How a batch item ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Changed something and succeeded.
    Ok,
    /// Nothing to do, or only a warning.
    Skipped,
    /// Planned under `--dry-run`.
    DryRun,
    /// Failed; counts toward a non-zero exit.
    Failed,
}

/// Everything that reports progress takes a `&dyn Log`.
///
/// [`Logger`](super::Logger) emits at once; [`BufferedLog`](super::BufferedLog)
/// holds a parallel tool's lines until it finishes.
pub trait Log: Send + Sync + std::fmt::Debug {
    /// `==>` section header.
    fn stage(&self, msg: &str);
    /// Normal progress line.
    fn info(&self, msg: &str);
    /// Console only with `--verbose`; always in the log file.
    fn debug(&self, msg: &str);
    /// Something the user should look at; the command continues.
    fn warn(&self, msg: &str);
    /// The command is about to fail.
    fn error(&self, msg: &str);
    /// What `--dry-run` would have done.
    fn dry_run(&self, msg: &str);
    /// Remember a batch item for the end-of-run summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);
}
