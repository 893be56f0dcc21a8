//! Semantic checks on a loaded [`Config`] for `config check` and `doctor`.
use super::{Config, KNOWN_KEYS};

/// A problem found in an otherwise loadable configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Config section the finding belongs to (e.g. "profiles").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.source, self.item, self.message)
    }
}

/// A single configuration check.
pub trait ConfigValidator {
    /// Return any warnings found in `config`.
    fn validate(&self, config: &Config) -> Vec<ValidationWarning>;

    /// Short name used in debug output.
    fn name(&self) -> &'static str;
}

/// Flags top-level keys the schema does not know.
#[derive(Debug)]
pub struct UnknownKeysValidator;

impl ConfigValidator for UnknownKeysValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        config
            .unknown_keys
            .iter()
            .map(|key| {
                ValidationWarning::new(
                    "config",
                    key,
                    format!("unknown key (expected one of: {})", KNOWN_KEYS.join(", ")),
                )
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "unknown-keys"
    }
}

/// Checks the `dotfiles:` section.
#[derive(Debug)]
pub struct DotfilesValidator;

impl ConfigValidator for DotfilesValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        match config.dotfiles.repo_url.as_deref() {
            None => warnings.push(ValidationWarning::new(
                "dotfiles",
                "repo_url",
                "not set; sync and backup need a remote",
            )),
            Some(url) if url.contains('{') => warnings.push(ValidationWarning::new(
                "dotfiles",
                "repo_url",
                format!("unresolved placeholder in '{url}'"),
            )),
            Some(_) => {}
        }
        if config.dotfiles.branch.trim().is_empty() {
            warnings.push(ValidationWarning::new("dotfiles", "branch", "must not be empty"));
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "dotfiles"
    }
}

/// Checks that profiles only reference declared tools.
#[derive(Debug)]
pub struct ProfileToolsValidator;

impl ConfigValidator for ProfileToolsValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        config
            .profiles
            .iter()
            .flat_map(|(name, profile)| {
                profile
                    .tools
                    .iter()
                    .filter(|tool| !config.tools.contains_key(*tool))
                    .map(move |tool| {
                        ValidationWarning::new(
                            "profiles",
                            name,
                            format!("tool '{tool}' is not declared under tools"),
                        )
                    })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "profile-tools"
    }
}

/// Checks that every tool has at least one way to be installed.
#[derive(Debug)]
pub struct ToolInstallValidator;

impl ConfigValidator for ToolInstallValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        config
            .tools
            .iter()
            .filter(|(_, t)| {
                t.brew.is_none()
                    && t.apt.is_none()
                    && t.cargo.is_none()
                    && t.pip.is_none()
                    && t.npm.is_none()
                    && t.script.is_none()
            })
            .map(|(name, _)| ValidationWarning::new("tools", name, "no install method declared"))
            .collect()
    }

    fn name(&self) -> &'static str {
        "tool-install"
    }
}

impl Config {
    /// Run every validator and collect the warnings.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationWarning> {
        let validators: [&dyn ConfigValidator; 4] = [
            &UnknownKeysValidator,
            &DotfilesValidator,
            &ProfileToolsValidator,
            &ToolInstallValidator,
        ];
        validators.iter().flat_map(|v| v.validate(self)).collect()
    }
}
