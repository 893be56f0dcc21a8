//! Tool registry: probes and installs the tools declared under `tools:`.
//!
//! A tool is probed with its `verify` command (run through `sh -c`) or, when
//! none is declared, by looking its name up on `PATH`. Installs pick the
//! platform's package manager first (brew on macOS, apt on Debian family),
//! then cargo, pip, npm and finally a curated script, using the first one
//! the tool declares and the machine has.
pub mod package;
mod parallel;

use std::sync::{Arc, Mutex};

pub use package::{InstallCommand, PackageManager};
pub(crate) use parallel::map_items;

use crate::config::profiles::Profile;
use crate::context::Context;
use crate::error::{ConfigError, FreckleError};
use crate::logging::{BufferedLog, Log};

/// Probe result for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    /// Tool name as declared in config.
    pub name: String,
    /// Whether the probe succeeded.
    pub installed: bool,
    /// First line of `<name> --version`, when available.
    pub version: Option<String>,
    /// Declared managers usable on this machine, in install order.
    pub methods: Vec<PackageManager>,
}

/// Successful result of [`ToolRegistry::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The probe already passed and `force` was not set.
    AlreadyInstalled {
        /// Detected version.
        version: Option<String>,
    },
    /// The install ran and the probe passes afterwards.
    Installed {
        /// Manager used.
        via: PackageManager,
        /// Detected version.
        version: Option<String>,
    },
    /// Dry run: the command that would have run.
    WouldInstall(InstallCommand),
}

/// Registry over the configured tools.
#[derive(Debug)]
pub struct ToolRegistry<'a> {
    ctx: &'a Context,
    /// brew and apt hold global locks; their installs run one at a time.
    os_lock: Mutex<()>,
}

impl<'a> ToolRegistry<'a> {
    /// Create a registry for the context's config and platform.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            os_lock: Mutex::new(()),
        }
    }

    /// Tool names to act on: the explicitly `requested` ones, every declared
    /// tool with `all` (or when no profile is given), else the profile's list.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::Config`] if a requested tool is not declared.
    pub fn select(
        &self,
        requested: &[String],
        profile: Option<&Profile>,
        all: bool,
    ) -> Result<Vec<String>, FreckleError> {
        let tools = &self.ctx.config.tools;
        if !requested.is_empty() {
            if let Some(unknown) = requested.iter().find(|n| !tools.contains_key(*n)) {
                return Err(ConfigError::Invalid(format!(
                    "tool '{unknown}' is not declared under tools"
                ))
                .into());
            }
            return Ok(requested.to_vec());
        }
        Ok(match profile {
            Some(p) if !all => p.tools.clone(),
            _ => tools.keys().cloned().collect(),
        })
    }

    /// Managers in install preference order for this platform.
    fn preference(&self) -> Vec<PackageManager> {
        self.ctx
            .platform
            .os_manager()
            .into_iter()
            .chain(PackageManager::FALLBACKS)
            .collect()
    }

    /// Declared managers that are usable here.
    fn methods(&self, name: &str) -> Vec<PackageManager> {
        let Some(settings) = self.ctx.config.tools.get(name) else {
            return Vec::new();
        };
        self.preference()
            .into_iter()
            .filter(|m| m.package(settings).is_some() && m.is_available(&*self.ctx.executor))
            .collect()
    }

    /// Probe one tool.
    #[must_use]
    pub fn probe(&self, name: &str) -> ToolStatus {
        let executor = &self.ctx.executor;
        let verify = self
            .ctx
            .config
            .tools
            .get(name)
            .and_then(|t| t.verify.as_deref());
        let installed = match verify {
            Some(cmd) => executor
                .run_unchecked("sh", &["-c", cmd])
                .is_ok_and(|r| r.success),
            None => executor.which(name),
        };
        let version = if installed && executor.which(name) {
            executor
                .run_unchecked(name, &["--version"])
                .ok()
                .filter(|r| r.success)
                .and_then(|r| {
                    r.stdout
                        .lines()
                        .map(str::trim)
                        .find(|l| !l.is_empty())
                        .map(String::from)
                })
        } else {
            None
        };
        ToolStatus {
            name: name.to_string(),
            installed,
            version,
            methods: self.methods(name),
        }
    }

    /// Probe `names` (concurrently unless disabled), sorted by name.
    #[must_use]
    pub fn status(&self, names: Vec<String>) -> Vec<ToolStatus> {
        let mut statuses = map_items(names, self.ctx.parallel, |name| self.probe(&name));
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// The install command that would be used for `name`.
    #[must_use]
    pub fn plan(&self, name: &str) -> Option<InstallCommand> {
        let settings = self.ctx.config.tools.get(name)?;
        self.preference().into_iter().find_map(|m| {
            m.package(settings)
                .and_then(|pkg| m.install_command(pkg, &*self.ctx.executor))
        })
    }

    /// Install one tool, logging to the context logger.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::ToolInstall`] when no method is available, the
    /// installer fails, or the probe still fails afterwards.
    pub fn install(&self, name: &str, force: bool) -> Result<InstallOutcome, FreckleError> {
        self.install_with_log(name, force, &*self.ctx.log)
    }

    fn install_with_log(
        &self,
        name: &str,
        force: bool,
        log: &dyn Log,
    ) -> Result<InstallOutcome, FreckleError> {
        let fail = |reason: String| FreckleError::ToolInstall {
            tool: name.to_string(),
            reason,
        };

        let before = self.probe(name);
        if before.installed && !force {
            log.debug(&format!("{name}: already installed"));
            return Ok(InstallOutcome::AlreadyInstalled {
                version: before.version,
            });
        }

        let Some(cmd) = self.plan(name) else {
            let declared = self
                .ctx
                .config
                .tools
                .get(name)
                .map(|t| {
                    [PackageManager::Brew, PackageManager::Apt]
                        .into_iter()
                        .chain(PackageManager::FALLBACKS)
                        .filter(|m| m.package(t).is_some())
                        .map(|m| m.to_string())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            return Err(fail(if declared.is_empty() {
                "no install method declared".to_string()
            } else {
                format!("none of the declared managers are available ({})", declared.join(", "))
            }));
        };

        if self.ctx.dry_run {
            log.dry_run(&format!("would install {name}: {cmd}"));
            return Ok(InstallOutcome::WouldInstall(cmd));
        }

        log.info(&format!("installing {name} via {}", cmd.manager));
        log.debug(&format!("{name}: {cmd}"));
        let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
        let result = {
            let _guard = matches!(cmd.manager, PackageManager::Brew | PackageManager::Apt).then(|| {
                self.os_lock
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
            });
            self.ctx.executor.run_unchecked(&cmd.program, &args)
        }
        .map_err(|e| fail(format!("{e:#}")))?;

        if !result.success {
            for line in result.stderr.lines() {
                log.debug(&format!("{name}: {line}"));
            }
            let last = result
                .stderr
                .lines()
                .map(str::trim)
                .rfind(|l| !l.is_empty())
                .unwrap_or("no output");
            return Err(fail(format!(
                "`{cmd}` exited with status {}: {last}",
                result.code.unwrap_or(-1)
            )));
        }

        let after = self.probe(name);
        if !after.installed {
            return Err(fail(format!(
                "{} reported success but the tool is still not found",
                cmd.manager
            )));
        }
        Ok(InstallOutcome::Installed {
            via: cmd.manager,
            version: after.version,
        })
    }

    /// Install every tool in `names`. One tool's failure never stops the
    /// others; results are sorted by name.
    #[must_use]
    pub fn install_many(
        &self,
        names: Vec<String>,
        force: bool,
    ) -> Vec<(String, Result<InstallOutcome, FreckleError>)> {
        let mut results = map_items(names, self.ctx.parallel, |name| {
            let buffered = BufferedLog::new(Arc::clone(&self.ctx.log));
            let outcome = self.install_with_log(&name, force, &buffered);
            buffered.flush();
            (name, outcome)
        });
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }
}
