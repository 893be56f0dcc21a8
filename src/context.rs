//! Shared per-invocation context.
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;
use crate::repo::BareRepo;
use crate::restore::RestorePoints;

/// Everything a command needs: immutable config, platform, logger, process
/// executor and the paths derived from the home directory.
#[derive(Clone)]
pub struct Context {
    /// Configuration loaded once at start-up.
    pub config: Arc<Config>,
    /// Detected platform information.
    pub platform: Arc<Platform>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Report mutating actions instead of performing them.
    pub dry_run: bool,
    /// Home directory; the work tree of the bare repository.
    pub home: PathBuf,
    /// Directory holding restore points.
    pub backup_root: PathBuf,
    /// Command executor (system or mock).
    pub executor: Arc<dyn Executor>,
    /// Probe and install tools concurrently.
    pub parallel: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &"<Config>")
            .field("platform", &self.platform)
            .field("dry_run", &self.dry_run)
            .field("home", &self.home)
            .field("backup_root", &self.backup_root)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Create a context rooted at `home`. Restore points default to
    /// `$XDG_DATA_HOME/freckle/backups` (or `<home>/.local/share/freckle/backups`).
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        platform: Arc<Platform>,
        log: Arc<dyn Log>,
        home: PathBuf,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let data_dir = std::env::var_os("XDG_DATA_HOME")
            .filter(|v| !v.is_empty())
            .map_or_else(|| home.join(".local").join("share"), PathBuf::from);
        Self {
            config,
            platform,
            log,
            dry_run: false,
            backup_root: data_dir.join("freckle").join("backups"),
            home,
            executor,
            parallel: true,
        }
    }

    /// Set dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable concurrent tool work.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Override where restore points are written.
    #[must_use]
    pub fn with_backup_root(mut self, root: PathBuf) -> Self {
        self.backup_root = root;
        self
    }

    /// Create a copy of this context with a different logger.
    #[must_use]
    pub fn with_log(&self, log: Arc<dyn Log>) -> Self {
        Self {
            log,
            ..self.clone()
        }
    }

    /// Path of the YAML config file (existing `.yaml`/`.yml`, or the default).
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        Config::path_in(&self.home)
    }

    /// Adapter for the bare dotfiles repository.
    #[must_use]
    pub fn repo(&self) -> BareRepo {
        BareRepo::new(
            self.config.dotfiles_dir(&self.home),
            self.home.clone(),
            Arc::clone(&self.executor),
            Arc::clone(&self.log),
        )
    }

    /// Restore point store.
    #[must_use]
    pub fn restore_points(&self) -> RestorePoints {
        RestorePoints::new(self.backup_root.clone())
    }
}
