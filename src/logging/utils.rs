//! Log file location, ANSI stripping and timestamps.
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// CSI sequences (`ESC [ params final`) plus bare two-byte escapes.
static ANSI: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1b(\[[0-?]*[ -/]*[@-~]|[@-Z\\-_])").ok());

/// Remove terminal colour and cursor codes so the log file stays plain text.
pub(super) fn strip_ansi(s: &str) -> String {
    ANSI.as_ref()
        .map_or_else(|| s.to_string(), |re| re.replace_all(s, "").into_owned())
}

/// `$XDG_CACHE_HOME/freckle` (default `~/.cache/freckle`), created on demand.
fn cache_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))?;
    let dir = base.join("freckle");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Log file for one subcommand, e.g. `~/.cache/freckle/backup.log`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    Some(cache_dir()?.join(format!("{command}.log")))
}

/// Local wall-clock time in `format`; restore points use local time too, so
/// log lines and point names line up.
pub(super) fn now(format: &str) -> String {
    chrono::Local::now().format(format).to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn strips_colours_and_cursor_codes() {
        assert_eq!(strip_ansi("\x1b[31merror:\x1b[0m push rejected"), "error: push rejected");
        assert_eq!(
            strip_ansi("\x1b[1;34m==>\x1b[0m \x1b[1mFetching\x1b[0m"),
            "==> Fetching"
        );
        assert_eq!(strip_ansi("\x1b[2K\x1b[1Gdone"), "done");
        assert_eq!(strip_ansi("plain ~/.zshrc"), "plain ~/.zshrc");
    }

    #[test]
    fn clock_format_is_applied() {
        let t = now("%H:%M:%S");
        assert_eq!(t.len(), 8);
        assert_eq!(t.matches(':').count(), 2);
    }
}
