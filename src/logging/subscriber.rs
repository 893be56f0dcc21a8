//! Global `tracing` subscriber: a coloured console layer and a plain-text
//! per-command log file.
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::Level;
use tracing::field::{Field, Visit};

use super::utils::{log_file_path, now, strip_ansi};

/// Target used for stage headers.
pub(super) const STAGE_TARGET: &str = "freckle::stage";
/// Target used for dry-run notices.
pub(super) const DRY_RUN_TARGET: &str = "freckle::dry_run";

/// How an event is presented, independent of where it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Stage,
    DryRun,
    Info,
    Warn,
    Error,
    Debug,
}

impl Kind {
    fn of(level: Level, target: &str) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO if target == STAGE_TARGET => Self::Stage,
            Level::INFO if target == DRY_RUN_TARGET => Self::DryRun,
            Level::INFO => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Console rendering, with ANSI colour.
    fn console(self, msg: &str) -> String {
        match self {
            Self::Stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Self::DryRun => format!("  \x1b[33m[dry run]\x1b[0m {msg}"),
            Self::Info => format!("  {msg}"),
            Self::Warn => format!("\x1b[33mwarning:\x1b[0m {msg}"),
            Self::Error => format!("\x1b[31merror:\x1b[0m {msg}"),
            Self::Debug => format!("  \x1b[2m{msg}\x1b[0m"),
        }
    }

    /// Log-file rendering: timestamped, tagged, no colour.
    fn file(self, time: &str, msg: &str) -> String {
        let msg = strip_ansi(msg);
        match self {
            Self::Stage => format!("[{time}] ==> {msg}"),
            Self::Info => format!("[{time}]     {msg}"),
            Self::DryRun => format!("[{time}]     [dry run] {msg}"),
            Self::Warn => format!("[{time}]     [warn] {msg}"),
            Self::Error => format!("[{time}]     [error] {msg}"),
            Self::Debug => format!("[{time}]     [debug] {msg}"),
        }
    }
}

/// Pulls the `message` field out of an event.
#[derive(Default)]
struct Message(String);

impl Visit for Message {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0 = value.to_string();
        }
    }
}

fn message_of(event: &tracing::Event<'_>) -> String {
    let mut message = Message::default();
    event.record(&mut message);
    message.0
}

/// Appends every event to `~/.cache/freckle/<command>.log`, whatever the
/// console verbosity.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Start a fresh log for `command` with a one-line run header. `None`
    /// when the cache directory is not writable; logging then goes to the
    /// console only.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version =
            option_env!("FRECKLE_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let header = format!(
            "# freckle {version} {command} started {}\n",
            now("%Y-%m-%d %H:%M:%S %z")
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let meta = event.metadata();
        let line = Kind::of(*meta.level(), meta.target()).file(&now("%H:%M:%S"), &message_of(event));
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(file, "{line}").ok();
    }
}

/// Console event format: no timestamps or targets, just the styled message.
struct ConsoleFormat;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        writeln!(writer, "{}", Kind::of(*meta.level(), meta.target()).console(&message_of(event)))
    }
}

/// Console verbosity selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only (scheduled backups).
    Quiet,
    /// Info and above.
    Normal,
    /// Everything, including the git commands being run.
    Verbose,
}

impl Verbosity {
    const fn console_level(self) -> tracing_subscriber::filter::LevelFilter {
        use tracing_subscriber::filter::LevelFilter;
        match self {
            Self::Quiet => LevelFilter::WARN,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
        }
    }
}

/// Install the global subscriber. Call once, before anything logs.
///
/// Warnings and errors go to stderr, the rest to stdout. `RUST_LOG`, when
/// set, overrides the console level chosen by `verbosity`.
pub fn init_subscriber(verbosity: Verbosity, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_filter = EnvFilter::builder()
        .with_default_directive(verbosity.console_level().into())
        .from_env_lossy();
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));
    let console = fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(writer)
        .with_filter(console_filter);
    let file = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry().with(console).with(file).init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn targets_pick_the_presentation() {
        assert_eq!(Kind::of(Level::INFO, STAGE_TARGET), Kind::Stage);
        assert_eq!(Kind::of(Level::INFO, DRY_RUN_TARGET), Kind::DryRun);
        assert_eq!(Kind::of(Level::INFO, "freckle::manager"), Kind::Info);
        assert_eq!(Kind::of(Level::WARN, STAGE_TARGET), Kind::Warn);
        assert_eq!(Kind::of(Level::TRACE, "x"), Kind::Debug);
    }

    #[test]
    fn file_lines_are_plain_and_tagged() {
        let lines: Vec<String> = [
            (Kind::Stage, "Fetching"),
            (Kind::Info, "committed 2 file(s)"),
            (Kind::DryRun, "would commit ~/.zshrc"),
            (Kind::Warn, "\x1b[33mpush blocked\x1b[0m"),
            (Kind::Debug, "git --git-dir ~/.dotfiles status"),
        ]
        .into_iter()
        .map(|(kind, msg)| kind.file("10:00:00", msg))
        .collect();
        insta::assert_snapshot!(lines.join("\n"), @r"
        [10:00:00] ==> Fetching
        [10:00:00]     committed 2 file(s)
        [10:00:00]     [dry run] would commit ~/.zshrc
        [10:00:00]     [warn] push blocked
        [10:00:00]     [debug] git --git-dir ~/.dotfiles status
        ");
    }

    #[test]
    fn console_errors_are_prefixed() {
        assert_eq!(
            strip_ansi(&Kind::Error.console("not a dotfiles repository")),
            "error: not a dotfiles repository"
        );
        assert_eq!(strip_ansi(&Kind::Stage.console("Updating 'main'")), "==> Updating 'main'");
    }
}
