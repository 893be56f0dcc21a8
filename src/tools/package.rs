//! Package-manager dispatch.
use crate::config::ToolSettings;
use crate::exec::Executor;

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackageManager {
    /// Homebrew (macOS).
    Brew,
    /// apt (Debian family Linux), run through `sudo`.
    Apt,
    /// `cargo install`.
    Cargo,
    /// pip in user mode.
    Pip,
    /// `npm install -g`.
    Npm,
    /// A curated install script or URL piped to `sh`.
    Script,
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Brew => "brew",
            Self::Apt => "apt",
            Self::Cargo => "cargo",
            Self::Pip => "pip",
            Self::Npm => "npm",
            Self::Script => "script",
        })
    }
}

/// Curated install scripts, keyed by the value allowed in `tools.<n>.script`.
const CURATED_SCRIPTS: &[(&str, &str)] = &[
    ("uv", "curl -LsSf https://astral.sh/uv/install.sh | sh"),
    (
        "rustup",
        "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y",
    ),
    ("starship", "curl -sS https://starship.rs/install.sh | sh -s -- -y"),
    (
        "nvm",
        "curl -o- https://raw.githubusercontent.com/nvm-sh/nvm/v0.40.1/install.sh | bash",
    ),
];

/// Shell command for a curated script key.
#[must_use]
pub fn curated_script(key: &str) -> Option<&'static str> {
    CURATED_SCRIPTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, cmd)| *cmd)
}

/// Shell command a `script:` value runs: a curated key, a URL piped to `sh`,
/// or the value itself.
#[must_use]
pub fn script_command(value: &str) -> String {
    curated_script(value).map_or_else(
        || {
            if value.starts_with("https://") || value.starts_with("http://") {
                format!("curl -fsSL {value} | sh")
            } else {
                value.to_string()
            }
        },
        String::from,
    )
}

/// A fully resolved install invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    /// Manager the command belongs to.
    pub manager: PackageManager,
    /// Program to execute.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
}

impl std::fmt::Display for InstallCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

impl PackageManager {
    /// Fallback managers tried after the OS manager, in order.
    pub const FALLBACKS: [Self; 4] = [Self::Cargo, Self::Pip, Self::Npm, Self::Script];

    /// Package name `tool` declares for this manager.
    #[must_use]
    pub fn package<'a>(self, tool: &'a ToolSettings) -> Option<&'a str> {
        match self {
            Self::Brew => tool.brew.as_deref(),
            Self::Apt => tool.apt.as_deref(),
            Self::Cargo => tool.cargo.as_deref(),
            Self::Pip => tool.pip.as_deref(),
            Self::Npm => tool.npm.as_deref(),
            Self::Script => tool.script.as_deref(),
        }
    }

    /// pip flavour to use: `pip3`, then `pip`, then `uv pip`.
    fn pip_program(executor: &dyn Executor) -> Option<(&'static str, &'static [&'static str])> {
        if executor.which("pip3") {
            Some(("pip3", &["install", "--user"]))
        } else if executor.which("pip") {
            Some(("pip", &["install", "--user"]))
        } else if executor.which("uv") {
            Some(("uv", &["pip", "install", "--system"]))
        } else {
            None
        }
    }

    /// Whether the manager can run on this machine.
    #[must_use]
    pub fn is_available(self, executor: &dyn Executor) -> bool {
        match self {
            Self::Brew => executor.which("brew"),
            Self::Apt => executor.which("apt-get"),
            Self::Cargo => executor.which("cargo"),
            Self::Pip => Self::pip_program(executor).is_some(),
            Self::Npm => executor.which("npm"),
            Self::Script => executor.which("sh") && executor.which("curl"),
        }
    }

    /// Build the install invocation for `package`.
    ///
    /// Returns `None` when the manager is not available.
    #[must_use]
    pub fn install_command(self, package: &str, executor: &dyn Executor) -> Option<InstallCommand> {
        let owned = |program: &str, args: &[&str]| InstallCommand {
            manager: self,
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        };
        if !self.is_available(executor) {
            return None;
        }
        Some(match self {
            Self::Brew => owned("brew", &["install", package]),
            Self::Apt => owned("sudo", &["apt-get", "install", "-y", package]),
            Self::Cargo => owned("cargo", &["install", package]),
            Self::Pip => {
                let (program, base) = Self::pip_program(executor)?;
                let mut args: Vec<&str> = base.to_vec();
                args.push(package);
                owned(program, &args)
            }
            Self::Npm => owned("npm", &["install", "-g", package]),
            Self::Script => owned("sh", &["-c", &script_command(package)]),
        })
    }
}
