//! Parsing of `git status --porcelain=v1 -z`.

/// State of one path relative to the index and `HEAD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileState {
    /// Changes recorded in the index, waiting for a commit.
    Staged,
    /// Tracked, changed in the work tree but not staged.
    Modified,
    /// Tracked, missing from the work tree.
    Deleted,
    /// Present in the work tree, unknown to the index.
    Untracked,
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Staged => "staged",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Untracked => "untracked",
        };
        f.pad(label)
    }
}

/// One line of `status` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Home-relative path.
    pub path: String,
    /// Classified state.
    pub state: FileState,
}

/// Parse NUL-separated porcelain v1 output.
///
/// Staged changes win over work-tree changes for the same path. Rename and
/// copy records carry an extra NUL-terminated source path which is skipped.
#[must_use]
pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut records = output.split('\0').filter(|r| !r.is_empty());
    while let Some(record) = records.next() {
        let (Some(code), Some(path)) = (record.get(..2), record.get(3..)) else {
            continue;
        };
        let mut chars = code.chars();
        let index = chars.next().unwrap_or(' ');
        let worktree = chars.next().unwrap_or(' ');
        if matches!(index, 'R' | 'C') {
            records.next();
        }
        let state = match (index, worktree) {
            ('?', '?') => FileState::Untracked,
            ('!', '!') => continue,
            (i, _) if i != ' ' => FileState::Staged,
            (_, 'D') => FileState::Deleted,
            _ => FileState::Modified,
        };
        entries.push(StatusEntry {
            path: path.to_string(),
            state,
        });
    }
    entries
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn classifies_each_state() {
        let out = " M .zshrc\0 D .vimrc\0A  .tmux.conf\0?? .newrc\0MM .gitconfig\0";
        let entries = parse_porcelain(out);
        let states: Vec<_> = entries.iter().map(|e| (e.path.as_str(), e.state)).collect();
        assert_eq!(
            states,
            vec![
                (".zshrc", FileState::Modified),
                (".vimrc", FileState::Deleted),
                (".tmux.conf", FileState::Staged),
                (".newrc", FileState::Untracked),
                (".gitconfig", FileState::Staged),
            ]
        );
    }

    #[test]
    fn rename_skips_source_path() {
        let out = "R  .config/new.toml\0.config/old.toml\0 M .bashrc\0";
        let entries = parse_porcelain(out);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, ".config/new.toml");
        assert_eq!(entries[1].path, ".bashrc");
    }

    #[test]
    fn paths_with_spaces_survive() {
        let entries = parse_porcelain(" M Library/Application Support/x.json\0");
        assert_eq!(entries[0].path, "Library/Application Support/x.json");
    }

    #[test]
    fn empty_output_is_clean() {
        assert!(parse_porcelain("").is_empty());
    }
}
