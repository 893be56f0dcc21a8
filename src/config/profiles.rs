//! Profile resolution and in-place edits of the `profiles:` section.
use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::{Config, ProfileSettings, yaml_loader};
use crate::error::{ConfigError, FreckleError};

/// A resolved profile: a branch plus the tools it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Profile name as written in config.
    pub name: String,
    /// Git branch backing the profile.
    pub branch: String,
    /// Optional description.
    pub description: Option<String>,
    /// Declared tool names.
    pub tools: Vec<String>,
}

impl Profile {
    fn from_settings(name: &str, settings: &ProfileSettings) -> Self {
        Self {
            name: name.to_string(),
            branch: settings.branch.clone().unwrap_or_else(|| name.to_string()),
            description: settings.description.clone(),
            tools: settings.tools.clone(),
        }
    }
}

/// All profiles declared in `config`, sorted by name.
#[must_use]
pub fn all(config: &Config) -> Vec<Profile> {
    config
        .profiles
        .iter()
        .map(|(name, settings)| Profile::from_settings(name, settings))
        .collect()
}

/// Resolve a profile by name.
///
/// # Errors
///
/// Returns [`FreckleError::UnknownProfile`] listing the available names.
pub fn resolve(config: &Config, name: &str) -> Result<Profile, FreckleError> {
    config
        .profiles
        .get(name)
        .map(|settings| Profile::from_settings(name, settings))
        .ok_or_else(|| unknown_profile(name, &config.profile_names()))
}

/// The profile whose branch is `branch`, if any.
#[must_use]
pub fn for_branch(config: &Config, branch: &str) -> Option<Profile> {
    all(config).into_iter().find(|p| p.branch == branch)
}

/// Build an [`FreckleError::UnknownProfile`] for `name`.
#[must_use]
pub fn unknown_profile(name: &str, available: &[String]) -> FreckleError {
    let available = if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    };
    FreckleError::UnknownProfile {
        name: name.to_string(),
        available,
    }
}

/// Add `name` to the `profiles:` mapping of the config file at `path`,
/// copying the tool list from `template` when given.
///
/// The file is edited as raw YAML so placeholders are preserved.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the profile already exists, or an
/// I/O/parse error from the loader.
pub fn add_to_file(path: &Path, name: &str, template: Option<&Profile>) -> Result<(), ConfigError> {
    let mut root = read_mapping(path)?;
    let profiles = profiles_mapping(&mut root)?;
    let key = Value::String(name.to_string());
    if profiles.contains_key(&key) {
        return Err(ConfigError::Invalid(format!("profile '{name}' already exists")));
    }
    let settings = ProfileSettings {
        branch: None,
        description: None,
        tools: template.map(|p| p.tools.clone()).unwrap_or_default(),
    };
    let value = serde_yaml::to_value(settings).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    profiles.insert(key, value);
    yaml_loader::write_value(path, &Value::Mapping(root))
}

/// Remove `name` from the `profiles:` mapping of the config file at `path`.
///
/// Returns `false` when the profile was not present.
///
/// # Errors
///
/// Returns an I/O or parse error from the loader.
pub fn remove_from_file(path: &Path, name: &str) -> Result<bool, ConfigError> {
    let mut root = read_mapping(path)?;
    let removed = profiles_mapping(&mut root)?
        .remove(Value::String(name.to_string()))
        .is_some();
    if removed {
        yaml_loader::write_value(path, &Value::Mapping(root))?;
    }
    Ok(removed)
}

fn read_mapping(path: &Path) -> Result<Mapping, ConfigError> {
    match yaml_loader::read_value(path)? {
        None | Some(Value::Null) => Ok(Mapping::new()),
        Some(Value::Mapping(map)) => Ok(map),
        Some(_) => Err(ConfigError::Invalid(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

fn profiles_mapping(root: &mut Mapping) -> Result<&mut Mapping, ConfigError> {
    let entry = root
        .entry(Value::String("profiles".to_string()))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if entry.is_null() {
        *entry = Value::Mapping(Mapping::new());
    }
    entry
        .as_mapping_mut()
        .ok_or_else(|| ConfigError::Invalid("profiles must be a mapping".to_string()))
}
