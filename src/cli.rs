use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "freckle",
    about = "Dotfiles manager backed by a bare git repository",
    version
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (shows every git command)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Profile to use instead of the one matching the current branch
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Override the home directory (the work tree)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Probe and install tools one at a time
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clone an existing dotfiles repository or start a new one
    Init(InitOpts),
    /// Clone the configured repository, or report status if it exists
    Sync,
    /// Commit tracked changes and push them
    Backup(BackupOpts),
    /// Fast-forward to the remote branch
    Update,
    /// Show repository state or the sync state of one file
    Status(StatusOpts),
    /// Check the installation for problems
    Doctor,
    /// Start tracking files
    Add(AddOpts),
    /// Stop tracking files
    Remove(RemoveOpts),
    /// Edit, check or propagate the config file
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage profiles (branches)
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Probe and install tools
    #[command(subcommand)]
    Tools(ToolsCommand),
    /// List or restore files moved aside during checkouts
    Restore(RestoreOpts),
    /// Show the commit history of one file
    History(HistoryOpts),
    /// Run `git diff` against the dotfiles repository
    Diff(PassthroughOpts),
    /// Run `git log` against the dotfiles repository
    Log(PassthroughOpts),
    /// Schedule automatic backups
    Schedule(ScheduleOpts),
    /// Print version information
    Version,
}

/// Options for `init`.
#[derive(Args, Debug, Clone)]
pub struct InitOpts {
    /// Remote to clone; defaults to `dotfiles.repo_url`
    pub repo_url: Option<String>,
}

/// Options for `backup`.
#[derive(Args, Debug, Clone)]
pub struct BackupOpts {
    /// Commit message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Commit locally without pushing
    #[arg(long)]
    pub no_push: bool,

    /// Only print warnings and errors (for scheduled runs)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Options for `status`.
#[derive(Args, Debug, Clone)]
pub struct StatusOpts {
    /// Report on a single file
    pub file: Option<String>,

    /// Do not contact the remote
    #[arg(long)]
    pub offline: bool,
}

/// Options for `add`.
#[derive(Args, Debug, Clone)]
pub struct AddOpts {
    /// Files to track
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Skip the secret scan
    #[arg(short, long)]
    pub force: bool,
}

/// Options for `remove`.
#[derive(Args, Debug, Clone)]
pub struct RemoveOpts {
    /// Files to stop tracking
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Also delete the files from disk
    #[arg(long)]
    pub delete: bool,
}

/// `config` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Open the config file in $EDITOR
    Open,
    /// Validate the config file
    Check,
    /// Commit files onto every profile branch
    Propagate(PropagateOpts),
}

/// Options for `config propagate`.
#[derive(Args, Debug, Clone)]
pub struct PropagateOpts {
    /// Files to propagate
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Target branch (repeatable); defaults to all profile branches
    #[arg(short, long = "branch")]
    pub branches: Vec<String>,

    /// Push each updated branch
    #[arg(long)]
    pub push: bool,

    /// Skip the secret scan for this invocation
    #[arg(long)]
    pub force: bool,
}

/// `profile` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// List declared profiles
    List,
    /// Check out another profile
    Switch {
        /// Profile name
        name: String,
    },
    /// Create a profile from the current one (or `--from`)
    Create {
        /// New profile name
        name: String,
        /// Profile or branch to start from
        #[arg(long)]
        from: Option<String>,
    },
    /// Delete a profile
    Delete {
        /// Profile name
        name: String,
        /// Also delete the branch on the remote
        #[arg(long)]
        remote: bool,
    },
    /// List files that differ from another profile
    Diff {
        /// Profile name
        name: String,
    },
}

/// `tools` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ToolsCommand {
    /// Show which tools are installed
    Status(ToolsOpts),
    /// Install tools
    Install {
        #[command(flatten)]
        select: ToolsOpts,
        /// Reinstall tools that are already present
        #[arg(short, long)]
        force: bool,
    },
    /// Open a tool's first config file in $EDITOR
    Config {
        /// Tool name
        name: String,
    },
}

/// Tool selection shared by `tools status` and `tools install`.
#[derive(Args, Debug, Clone)]
pub struct ToolsOpts {
    /// Tools to act on; defaults to the profile's tools
    pub names: Vec<String>,

    /// Every declared tool, ignoring the profile
    #[arg(short, long, conflicts_with = "names")]
    pub all: bool,
}

/// Options for `restore`.
#[derive(Args, Debug, Clone)]
pub struct RestoreOpts {
    /// Restore point name (or unique prefix)
    #[arg(required_unless_present = "list")]
    pub point: Option<String>,

    /// List restore points
    #[arg(short, long, conflicts_with_all = ["point", "files", "delete"])]
    pub list: bool,

    /// Restore only these files (repeatable)
    #[arg(short, long = "file")]
    pub files: Vec<String>,

    /// Delete the restore point instead of restoring it
    #[arg(long, conflicts_with = "files")]
    pub delete: bool,
}

/// Options for `history`.
#[derive(Args, Debug, Clone)]
pub struct HistoryOpts {
    /// File to show
    pub file: String,

    /// Number of commits
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

/// Arguments forwarded to git unchanged.
#[derive(Args, Debug, Clone)]
pub struct PassthroughOpts {
    /// Extra git arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Options for `schedule`.
#[derive(Args, Debug, Clone)]
pub struct ScheduleOpts {
    /// daily, weekly or off; omit to show the current schedule
    #[arg(value_enum)]
    pub frequency: Option<ScheduleChoice>,

    /// Hour of day; defaults to `schedule.hour`
    #[arg(long)]
    pub hour: Option<u8>,

    /// Minute; defaults to `schedule.minute`
    #[arg(long)]
    pub minute: Option<u8>,
}

/// `schedule` argument.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleChoice {
    /// Every day
    Daily,
    /// Every Sunday
    Weekly,
    /// Remove the schedule
    Off,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Sync => "sync",
            Self::Backup(_) => "backup",
            Self::Update => "update",
            Self::Status(_) => "status",
            Self::Doctor => "doctor",
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::Config(_) => "config",
            Self::Profile(_) => "profile",
            Self::Tools(_) => "tools",
            Self::Restore(_) => "restore",
            Self::History(_) => "history",
            Self::Diff(_) => "diff",
            Self::Log(_) => "log",
            Self::Schedule(_) => "schedule",
            Self::Version => "version",
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommand_surface() {
        let names: Vec<String> = Cli::command()
            .get_subcommands()
            .map(|c| {
                let subs: Vec<&str> = c.get_subcommands().map(clap::Command::get_name).collect();
                if subs.is_empty() {
                    c.get_name().to_string()
                } else {
                    format!("{} [{}]", c.get_name(), subs.join("|"))
                }
            })
            .collect();
        insta::assert_snapshot!(names.join("\n"), @r"
        init
        sync
        backup
        update
        status
        doctor
        add
        remove
        config [open|check|propagate]
        profile [list|switch|create|delete|diff]
        tools [status|install|config]
        restore
        history
        diff
        log
        schedule
        version
        ");
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["freckle", "backup", "-d", "-v", "--home", "/tmp/h"]);
        assert!(cli.global.dry_run);
        assert!(cli.verbose);
        assert_eq!(cli.global.home, Some(PathBuf::from("/tmp/h")));
        assert!(cli.global.parallel);
    }

    #[test]
    fn no_parallel_disables_parallel() {
        let cli = Cli::parse_from(["freckle", "--no-parallel", "tools", "status"]);
        assert!(!cli.global.parallel);
    }

    #[test]
    fn backup_options() {
        let cli = Cli::parse_from(["freckle", "backup", "-m", "msg", "--no-push", "--quiet"]);
        let Command::Backup(opts) = cli.command else {
            panic!("expected backup");
        };
        assert_eq!(opts.message.as_deref(), Some("msg"));
        assert!(opts.no_push && opts.quiet);
    }

    #[test]
    fn add_requires_files() {
        assert!(Cli::try_parse_from(["freckle", "add"]).is_err());
        let cli = Cli::parse_from(["freckle", "add", "--force", ".zshrc", ".vimrc"]);
        let Command::Add(opts) = cli.command else {
            panic!("expected add");
        };
        assert!(opts.force);
        assert_eq!(opts.files, vec![".zshrc", ".vimrc"]);
    }

    #[test]
    fn propagate_branches_repeat() {
        let cli = Cli::parse_from([
            "freckle", "config", "propagate", ".gitconfig", "-b", "work", "--branch", "main",
        ]);
        let Command::Config(ConfigCommand::Propagate(opts)) = cli.command else {
            panic!("expected propagate");
        };
        assert_eq!(opts.branches, vec!["work", "main"]);
    }

    #[test]
    fn restore_list_or_point() {
        let cli = Cli::parse_from(["freckle", "restore", "--list"]);
        let Command::Restore(opts) = cli.command else {
            panic!("expected restore");
        };
        assert!(opts.list);
        assert!(Cli::try_parse_from(["freckle", "restore"]).is_err());
        assert!(Cli::try_parse_from(["freckle", "restore", "--list", "2024"]).is_err());
        let cli = Cli::parse_from(["freckle", "restore", "2024-05", "--file", ".zshrc"]);
        let Command::Restore(opts) = cli.command else {
            panic!("expected restore");
        };
        assert_eq!(opts.point.as_deref(), Some("2024-05"));
        assert_eq!(opts.files, vec![".zshrc"]);
    }

    #[test]
    fn passthrough_keeps_hyphen_args() {
        let cli = Cli::parse_from(["freckle", "log", "--oneline", "-5"]);
        let Command::Log(opts) = cli.command else {
            panic!("expected log");
        };
        assert_eq!(opts.args, vec!["--oneline", "-5"]);
    }

    #[test]
    fn schedule_choices() {
        let cli = Cli::parse_from(["freckle", "schedule", "weekly", "--hour", "21"]);
        let Command::Schedule(opts) = cli.command else {
            panic!("expected schedule");
        };
        assert_eq!(opts.frequency, Some(ScheduleChoice::Weekly));
        assert_eq!(opts.hour, Some(21));
        let cli = Cli::parse_from(["freckle", "schedule"]);
        assert_eq!(cli.command.name(), "schedule");
    }

    #[test]
    fn tools_all_conflicts_with_names() {
        assert!(Cli::try_parse_from(["freckle", "tools", "install", "--all", "rg"]).is_err());
        let cli = Cli::parse_from(["freckle", "tools", "install", "--all", "--force"]);
        let Command::Tools(ToolsCommand::Install { select, force }) = cli.command else {
            panic!("expected tools install");
        };
        assert!(select.all && force);
    }
}
