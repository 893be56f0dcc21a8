//! The `~/.freckle.yaml` configuration.
//!
//! Loaded once per invocation into an immutable [`Config`] that is shared via
//! `Arc` through [`Context`](crate::context::Context). Commands that edit the
//! file (`profile create/delete`) go through [`profiles`] and rewrite the YAML
//! on disk without touching the loaded value.
pub mod profiles;
pub mod validation;
pub mod yaml_loader;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Config file names looked up in the home directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &[".freckle.yaml", ".freckle.yml"];

/// Top-level keys the schema understands.
pub const KNOWN_KEYS: &[&str] = &[
    "version", "vars", "dotfiles", "profiles", "tools", "secrets", "schedule",
];

/// Parsed configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Placeholder table substituted into every string value at load time.
    pub vars: BTreeMap<String, String>,
    /// Repository location and default branch.
    pub dotfiles: DotfilesSettings,
    /// Profile name → definition.
    pub profiles: BTreeMap<String, ProfileSettings>,
    /// Tool name → install mappings.
    pub tools: BTreeMap<String, ToolSettings>,
    /// Extra allow/block rules for the secret scanner.
    pub secrets: SecretsSettings,
    /// Scheduled backup time.
    pub schedule: ScheduleSettings,
    /// File this config was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
    /// Top-level keys not in [`KNOWN_KEYS`].
    #[serde(skip)]
    pub unknown_keys: Vec<String>,
}

/// `dotfiles:` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DotfilesSettings {
    /// Remote to clone from and push to.
    pub repo_url: Option<String>,
    /// Branch checked out when no profile says otherwise.
    pub branch: String,
    /// Bare repository location; `~` and relative paths resolve against home.
    pub dir: String,
}

impl Default for DotfilesSettings {
    fn default() -> Self {
        Self {
            repo_url: None,
            branch: "main".to_string(),
            dir: "~/.dotfiles".to_string(),
        }
    }
}

/// One entry under `profiles:`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProfileSettings {
    /// Branch backing the profile; defaults to the profile name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tools this profile wants installed.
    pub tools: Vec<String>,
}

/// One entry under `tools:`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolSettings {
    /// Free-form description.
    pub description: Option<String>,
    /// Homebrew formula.
    pub brew: Option<String>,
    /// apt package.
    pub apt: Option<String>,
    /// cargo crate.
    pub cargo: Option<String>,
    /// pip package.
    pub pip: Option<String>,
    /// npm package (installed globally).
    pub npm: Option<String>,
    /// Curated install script key (see [`crate::tools::package::curated_script`]).
    pub script: Option<String>,
    /// Shell command that exits zero when the tool is installed.
    pub verify: Option<String>,
    /// Home-relative config files kept aligned across profile branches.
    pub config_files: Vec<String>,
}

/// `secrets:` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecretsSettings {
    /// Extra glob patterns always treated as secrets.
    pub block: Vec<String>,
    /// Glob patterns never treated as secrets.
    pub allow: Vec<String>,
}

/// `schedule:` section.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Hour of day (0-23).
    pub hour: u8,
    /// Minute (0-59).
    pub minute: u8,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self { hour: 9, minute: 0 }
    }
}

impl Config {
    /// Locate the config file under `home`: the first existing name in
    /// [`CONFIG_FILE_NAMES`], otherwise the default `.freckle.yaml` path.
    #[must_use]
    pub fn path_in(home: &Path) -> PathBuf {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| home.join(name))
            .find(|p| p.exists())
            .unwrap_or_else(|| home.join(".freckle.yaml"))
    }

    /// Load the config for `home`, substituting `{local_user}` and `vars`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(home: &Path, local_user: &str) -> Result<Self, ConfigError> {
        let path = Self::path_in(home);
        match yaml_loader::read_value(&path)? {
            Some(value) => Self::from_value(value, &path, local_user),
            None => Ok(Self::default()),
        }
    }

    /// Parse config text. Used by tests and by `config check`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed YAML or schema mismatches.
    pub fn from_yaml_str(text: &str, local_user: &str) -> Result<Self, ConfigError> {
        let path = Path::new("<inline>");
        let value = yaml_loader::parse_value(text, path)?;
        let mut config = Self::from_value(value, path, local_user)?;
        config.source = None;
        Ok(config)
    }

    fn from_value(
        mut value: serde_yaml::Value,
        path: &Path,
        local_user: &str,
    ) -> Result<Self, ConfigError> {
        if !value.is_null() && !value.is_mapping() {
            return Err(ConfigError::Invalid(format!(
                "{} must contain a mapping at the top level",
                path.display()
            )));
        }
        let table = yaml_loader::replacements(&value, local_user);
        yaml_loader::substitute(&mut value, &table);

        let unknown_keys = value
            .as_mapping()
            .map(|map| {
                map.keys()
                    .filter_map(serde_yaml::Value::as_str)
                    .filter(|k| !KNOWN_KEYS.contains(k))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut config: Self = yaml_loader::from_value(value, path)?;
        config.source = Some(path.to_path_buf());
        config.unknown_keys = unknown_keys;
        Ok(config)
    }

    /// Bare repository directory: `~` and relative paths resolve against
    /// `home`, never against the process working directory.
    #[must_use]
    pub fn dotfiles_dir(&self, home: &Path) -> PathBuf {
        expand_home(&self.dotfiles.dir, home)
    }

    /// Sorted profile names.
    #[must_use]
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Branch backing `profile`: its `branch` field, else the profile name.
    #[must_use]
    pub fn profile_branch(&self, profile: &str) -> String {
        self.profiles
            .get(profile)
            .and_then(|p| p.branch.clone())
            .unwrap_or_else(|| profile.to_string())
    }

    /// Every config file declared by any tool, deduplicated and sorted.
    #[must_use]
    pub fn tool_config_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .tools
            .values()
            .flat_map(|t| t.config_files.iter().cloned())
            .collect();
        files.sort();
        files.dedup();
        files
    }
}

/// Expand a leading `~` and anchor relative paths at `home`.
#[must_use]
pub fn expand_home(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        return home.join(rest);
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}
