//! Domain error types for freckle.
//!
//! Library modules return [`FreckleError`] (or one of its sub-errors) while
//! command handlers at the CLI boundary convert them to [`anyhow::Error`] via
//! the `?` operator. `main` downcasts the root cause back to
//! [`FreckleError`] to print its remediation [`hint`](FreckleError::hint).
//!
//! # Error hierarchy
//!
//! ```text
//! FreckleError
//! ├── Config(ConfigError)         malformed or missing config, fatal
//! ├── Git(GitCommandError)        non-zero exit from git, carries stderr
//! ├── NotTracked / OutsideHome / NothingToCommit
//! ├── UnknownProfile
//! ├── SecretDetected / ScanFailed add and propagate gate
//! ├── ToolInstall                 collected per tool in batches
//! ├── ConflictRelocation          checkout aborted, work tree untouched
//! └── NotInitialized / Diverged / RestorePoint
//! ```
use std::path::PathBuf;

use thiserror::Error;

use crate::secrets::Finding;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum FreckleError {
    /// Configuration could not be loaded or is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A git command exited non-zero.
    #[error(transparent)]
    Git(#[from] GitCommandError),

    /// `remove` named a path the index does not contain.
    #[error("not tracked: {0}")]
    NotTracked(String),

    /// A path given to `add`, `remove` or `status` resolves outside the
    /// home directory.
    #[error("{0} is outside the home directory")]
    OutsideHome(String),

    /// `commit` was asked to record an empty stage.
    #[error("nothing to commit")]
    NothingToCommit,

    /// A profile or branch name that does not exist.
    #[error("unknown profile '{name}' (available: {available})")]
    UnknownProfile {
        /// Requested name.
        name: String,
        /// Comma-separated list of known profiles.
        available: String,
    },

    /// `add` or `config propagate` found content or a filename that looks
    /// like a secret.
    #[error("{}", describe_findings(.0))]
    SecretDetected(Vec<Finding>),

    /// A path could not be scanned for secrets, so it is not tracked.
    #[error("could not scan ~/{path} for secrets: {source}")]
    ScanFailed {
        /// Home-relative path given by the user.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A tool could not be installed or failed verification afterwards.
    #[error("failed to install {tool}: {reason}")]
    ToolInstall {
        /// Tool name as declared in config.
        tool: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A conflicting file could not be moved into a restore point.
    #[error("could not move {} aside: {source}", .path.display())]
    ConflictRelocation {
        /// Work-tree path that failed to move.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The bare repository does not exist yet.
    #[error("dotfiles repository not found at {}", .0.display())]
    NotInitialized(PathBuf),

    /// Local and remote history both have commits the other lacks.
    #[error("branch '{branch}' has diverged from origin ({ahead} ahead, {behind} behind)")]
    Diverged {
        /// Branch name.
        branch: String,
        /// Local-only commits.
        ahead: u32,
        /// Remote-only commits.
        behind: u32,
    },

    /// Restore point lookup or restore failure.
    #[error(transparent)]
    RestorePoint(#[from] RestorePointError),
}

impl FreckleError {
    /// Remediation text shown under the error message.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Config(ConfigError::MissingRepoUrl) => {
                Some("set dotfiles.repo_url in ~/.freckle.yaml or run `freckle init`".into())
            }
            Self::Config(_) => Some("run `freckle config check` for details".into()),
            Self::NotTracked(_) => Some("run `freckle status` to list tracked files".into()),
            Self::OutsideHome(_) => Some("only files under $HOME can be tracked".into()),
            Self::NothingToCommit => Some("change a tracked file or `freckle add` one first".into()),
            Self::UnknownProfile { .. } => Some("run `freckle profile list`".into()),
            Self::SecretDetected(_) => Some(
                "run `freckle add --force` (or `freckle config propagate --force`) to override".into(),
            ),
            Self::ScanFailed { .. } => {
                Some("fix the permissions, or re-run with `--force` to skip the scan".into())
            }
            Self::ToolInstall { tool, .. } => {
                Some(format!("run `freckle tools install {tool} --verbose` to see the installer output"))
            }
            Self::ConflictRelocation { .. } => {
                Some("check permissions and free space, then retry".into())
            }
            Self::NotInitialized(_) => Some("run `freckle init` or `freckle sync`".into()),
            Self::Diverged { .. } => Some(
                "resolve manually with `freckle log` and `freckle diff`, or run `freckle backup` after pulling"
                    .into(),
            ),
            Self::RestorePoint(_) => Some("run `freckle restore --list`".into()),
            Self::Git(_) => None,
        }
    }
}

fn describe_findings(findings: &[Finding]) -> String {
    match findings {
        [] => "possible secret detected".to_string(),
        [only] => format!("possible secret in {only}"),
        [first, rest @ ..] => format!(
            "possible secret in {first} (and {} more finding(s))",
            rest.len()
        ),
    }
}

/// Errors from loading or editing the YAML configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid YAML or does not match the schema.
    #[error("invalid YAML in {}: {source}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying parser error.
        source: serde_yaml::Error,
    },

    /// The config file could not be written back.
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A clone was requested but no repository URL is configured.
    #[error("dotfiles.repo_url is not set")]
    MissingRepoUrl,

    /// A value is structurally valid but unusable.
    #[error("{0}")]
    Invalid(String),
}

/// A git invocation that exited non-zero.
#[derive(Error, Debug, Clone)]
#[error("git {command} failed (exit {}): {}", .code.unwrap_or(-1), .stderr.trim())]
pub struct GitCommandError {
    /// Arguments after the bare-repo prefix, space separated.
    pub command: String,
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
    /// Captured standard error.
    pub stderr: String,
}

/// Errors from the restore point store.
#[derive(Error, Debug)]
pub enum RestorePointError {
    /// No restore point matches the given name or prefix.
    #[error("no restore point matches '{0}'")]
    NotFound(String),

    /// More than one restore point matches the given prefix.
    #[error("'{prefix}' matches several restore points: {matches}")]
    Ambiguous {
        /// Requested prefix.
        prefix: String,
        /// Comma-separated matching names.
        matches: String,
    },

    /// A requested file is not part of the restore point.
    #[error("{file} is not in restore point {point}")]
    MissingFile {
        /// Restore point name.
        point: String,
        /// Requested relative path.
        file: String,
    },

    /// Reading or writing the restore point failed.
    #[error("restore point I/O on {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest could not be parsed or written.
    #[error("restore point manifest {}: {source}", .path.display())]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn unknown_profile_display() {
        let e = FreckleError::UnknownProfile {
            name: "laptop".into(),
            available: "main, work".into(),
        };
        assert_eq!(
            e.to_string(),
            "unknown profile 'laptop' (available: main, work)"
        );
        assert_eq!(e.hint().as_deref(), Some("run `freckle profile list`"));
    }

    #[test]
    fn git_error_display_includes_stderr() {
        let e = GitCommandError {
            command: "push origin main".into(),
            code: Some(128),
            stderr: "fatal: unable to access remote\n".into(),
        };
        assert_eq!(
            e.to_string(),
            "git push origin main failed (exit 128): fatal: unable to access remote"
        );
    }

    #[test]
    fn secret_detected_names_file_and_pattern() {
        let e = FreckleError::SecretDetected(vec![Finding {
            path: ".aws/config".into(),
            rule: "AWS access key".into(),
            line: Some(3),
            excerpt: "AKIA************".into(),
        }]);
        let msg = e.to_string();
        assert!(msg.contains(".aws/config"), "{msg}");
        assert!(msg.contains("AWS access key"), "{msg}");
        assert!(e.hint().unwrap().contains("--force"));
    }

    #[test]
    fn secret_detected_counts_extra_findings() {
        let finding = Finding {
            path: ".env".into(),
            rule: "dotenv file".into(),
            line: None,
            excerpt: String::new(),
        };
        let e = FreckleError::SecretDetected(vec![finding.clone(), finding]);
        assert!(e.to_string().ends_with("(and 1 more finding(s))"));
    }

    #[test]
    fn conflict_relocation_has_source() {
        use std::error::Error as StdError;
        let e = FreckleError::ConflictRelocation {
            path: PathBuf::from("/home/u/.zshrc"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains(".zshrc"));
    }

    #[test]
    fn config_error_converts_and_keeps_hint() {
        let e: FreckleError = ConfigError::MissingRepoUrl.into();
        assert!(e.to_string().starts_with("configuration error"));
        assert!(e.hint().unwrap().contains("repo_url"));
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FreckleError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<RestorePointError>();
    }

    #[test]
    fn converts_to_anyhow_and_downcasts() {
        let err: anyhow::Error = FreckleError::NothingToCommit.into();
        let back = err.downcast_ref::<FreckleError>().expect("downcast");
        assert!(matches!(back, FreckleError::NothingToCommit));
    }
}
