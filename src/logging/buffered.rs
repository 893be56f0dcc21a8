//! Buffered logger for parallel work.
use std::sync::{Arc, Mutex};

use super::types::{Log, TaskStatus};

/// Serializes flushes so two finished units never interleave their lines.
static FLUSH_LOCK: Mutex<()> = Mutex::new(());

/// A single buffered log entry, replayed when flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogEntry {
    Stage(String),
    Info(String),
    Debug(String),
    Warn(String),
    Error(String),
    DryRun(String),
}

/// Buffer each display method into `self.entries` as the matching variant.
macro_rules! buffer_log_methods {
    ($($method:ident => $variant:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                if let Ok(mut guard) = self.entries.lock() {
                    guard.push(LogEntry::$variant(msg.to_string()));
                }
            }
        )+
    };
}

/// Captures display output in memory so that parallel tool installs do not
/// interleave their console lines. Call [`flush`](Self::flush) once the unit
/// of work is done.
///
/// [`record_task`](Log::record_task) goes straight to the inner log since the
/// summary collection is already thread-safe.
#[derive(Debug)]
pub struct BufferedLog {
    inner: Arc<dyn Log>,
    entries: Mutex<Vec<LogEntry>>,
}

impl BufferedLog {
    /// Create a buffer in front of `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn Log>) -> Self {
        Self {
            inner,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Replay buffered entries to the inner log in order and clear the buffer.
    pub fn flush(&self) {
        let _guard = FLUSH_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let entries = match self.entries.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => return,
        };
        for entry in &entries {
            match entry {
                LogEntry::Stage(msg) => self.inner.stage(msg),
                LogEntry::Info(msg) => self.inner.info(msg),
                LogEntry::Debug(msg) => self.inner.debug(msg),
                LogEntry::Warn(msg) => self.inner.warn(msg),
                LogEntry::Error(msg) => self.inner.error(msg),
                LogEntry::DryRun(msg) => self.inner.dry_run(msg),
            }
        }
    }
}

impl Log for BufferedLog {
    buffer_log_methods! {
        stage   => Stage,
        info    => Info,
        debug   => Debug,
        warn    => Warn,
        error   => Error,
        dry_run => DryRun,
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        self.inner.record_task(name, status, message);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;

    #[test]
    fn nothing_reaches_inner_before_flush() {
        let inner = Arc::new(MemoryLog::default());
        let buf = BufferedLog::new(Arc::clone(&inner) as Arc<dyn Log>);
        buf.info("installing fzf");
        assert!(inner.lines().is_empty());
        buf.flush();
        assert_eq!(inner.lines(), vec!["info: installing fzf"]);
    }

    #[test]
    fn flush_preserves_order_and_empties_buffer() {
        let inner = Arc::new(MemoryLog::default());
        let buf = BufferedLog::new(Arc::clone(&inner) as Arc<dyn Log>);
        buf.stage("fzf");
        buf.debug("brew install fzf");
        buf.warn("slow mirror");
        buf.flush();
        buf.flush();
        assert_eq!(
            inner.lines(),
            vec!["stage: fzf", "debug: brew install fzf", "warn: slow mirror"]
        );
    }

    #[test]
    fn record_task_is_not_buffered() {
        let inner = Arc::new(MemoryLog::default());
        let buf = BufferedLog::new(Arc::clone(&inner) as Arc<dyn Log>);
        buf.record_task("fzf", TaskStatus::Ok, None);
        assert_eq!(inner.tasks().len(), 1);
    }
}
