//! Profile operations. A profile is a branch; its tool list lives in the
//! config file.
use super::DotfilesManager;
use super::propagate::PropagateReport;
use crate::config::profiles::{self, Profile};
use crate::error::{ConfigError, FreckleError};
use crate::restore::Resolution;

/// One row of `profile list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    /// Declared profile.
    pub profile: Profile,
    /// Its branch is checked out.
    pub current: bool,
    /// Branch exists locally.
    pub local: bool,
    /// Branch exists on `origin`.
    pub remote: bool,
}

/// Result of `profile switch`.
#[derive(Debug)]
pub struct SwitchReport {
    /// Branch now checked out.
    pub branch: String,
    /// It was already checked out; nothing changed.
    pub already_current: bool,
    /// Files moved aside before the checkout.
    pub resolution: Resolution,
}

/// Result of `profile create` and `profile delete`.
#[derive(Debug, Default)]
pub struct ProfileChange {
    /// Branch created or deleted.
    pub branch: String,
    /// Config-file propagation to the remaining branches, when the config
    /// file is tracked.
    pub propagated: Option<PropagateReport>,
    /// Warning about the remote step, which never fails the operation.
    pub remote_warning: Option<String>,
}

impl DotfilesManager<'_> {
    /// Declared profiles with their branch state.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::Git`] if branches cannot be listed.
    pub fn list_profiles(&self) -> Result<Vec<ProfileEntry>, FreckleError> {
        let (current, local, remote) = if self.repo.exists() {
            (
                self.repo.current_branch().ok(),
                self.repo.local_branches()?,
                self.repo.remote_branches()?,
            )
        } else {
            (None, Vec::new(), Vec::new())
        };
        Ok(profiles::all(&self.ctx.config)
            .into_iter()
            .map(|profile| ProfileEntry {
                current: current.as_deref() == Some(profile.branch.as_str()),
                local: local.contains(&profile.branch),
                remote: remote.contains(&profile.branch),
                profile,
            })
            .collect())
    }

    /// Branch for a profile name; undeclared names are taken as branch
    /// names.
    fn branch_for(&self, name: &str) -> String {
        self.ctx.config.profile_branch(name)
    }

    fn config_rel(&self) -> Option<String> {
        let path = self.ctx.config_path();
        let rel = path.strip_prefix(&self.ctx.home).ok()?.to_string_lossy().to_string();
        self.repo.is_tracked(&rel).then_some(rel)
    }

    /// Check out the branch of profile `name`, moving conflicting files into
    /// a restore point first.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::UnknownProfile`] when neither a local nor a
    /// remote branch exists, or [`FreckleError`] from relocation and git.
    pub fn switch_profile(&self, name: &str) -> Result<SwitchReport, FreckleError> {
        self.repo.ensure_exists()?;
        let branch = self.branch_for(name);
        let local = self.repo.branch_exists(&branch);
        if !local && !self.repo.remote_branch_exists(&branch) {
            let mut known = self.ctx.config.profile_names();
            if known.is_empty() {
                known = self.repo.list_branches()?;
            }
            return Err(profiles::unknown_profile(name, &known));
        }
        if self.repo.current_branch().ok().as_deref() == Some(branch.as_str()) {
            return Ok(SwitchReport {
                branch,
                already_current: true,
                resolution: Resolution::default(),
            });
        }

        let target = if local {
            branch.clone()
        } else {
            format!("origin/{branch}")
        };
        let resolution = self
            .resolver()
            .resolve(&target, &format!("profile switch {branch}"))?;
        if self.ctx.dry_run {
            self.ctx.log.dry_run(&format!("would check out '{branch}'"));
        } else {
            if !local {
                self.repo.create_branch(&branch, Some(&target))?;
            }
            self.repo.checkout(&branch)?;
        }
        Ok(SwitchReport {
            branch,
            already_current: false,
            resolution,
        })
    }

    /// Create profile `name` as a new branch from `from` (a profile or
    /// branch; the current branch by default) and declare it in the config
    /// file, copying the source profile's tools.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the profile or branch exists,
    /// [`FreckleError::UnknownProfile`] for an unknown source, or git errors.
    pub fn create_profile(&self, name: &str, from: Option<&str>) -> Result<ProfileChange, FreckleError> {
        self.repo.ensure_exists()?;
        if self.ctx.config.profiles.contains_key(name) {
            return Err(ConfigError::Invalid(format!("profile '{name}' already exists")).into());
        }
        if self.repo.branch_exists(name) {
            return Err(ConfigError::Invalid(format!(
                "branch '{name}' already exists; delete it or pick another name"
            ))
            .into());
        }
        let source = match from {
            Some(f) => self.branch_for(f),
            None => self.repo.current_branch()?,
        };
        if self.repo.resolve(&source).is_none() {
            return Err(profiles::unknown_profile(
                from.unwrap_or(&source),
                &self.ctx.config.profile_names(),
            ));
        }
        let template = from
            .and_then(|f| profiles::resolve(&self.ctx.config, f).ok())
            .or_else(|| profiles::for_branch(&self.ctx.config, &source));

        if self.ctx.dry_run {
            self.ctx
                .log
                .dry_run(&format!("would create branch '{name}' from '{source}'"));
            self.ctx.log.dry_run(&format!(
                "would add profile '{name}' to {}",
                self.ctx.config_path().display()
            ));
            return Ok(ProfileChange {
                branch: name.to_string(),
                ..ProfileChange::default()
            });
        }

        self.repo.create_branch(name, Some(&source))?;
        profiles::add_to_file(&self.ctx.config_path(), name, template.as_ref())?;
        self.ctx.log.info(&format!("created profile '{name}' from '{source}'"));

        let propagated = match self.config_rel() {
            Some(rel) => {
                let mut branches = self.profile_branches()?;
                branches.push(name.to_string());
                branches.sort();
                branches.dedup();
                Some(self.propagate_files(&[rel], &branches, &format!("Add profile: {name}"), false)?)
            }
            None => None,
        };

        let remote_warning = if self.repo.has_remote() {
            match self.repo.push(name) {
                Ok(plan) => plan.blocked_reason(),
                Err(e) => Some(e.to_string()),
            }
        } else {
            None
        };
        Ok(ProfileChange {
            branch: name.to_string(),
            propagated,
            remote_warning,
        })
    }

    /// Delete profile `name`: its local branch, its config entry and, with
    /// `remote`, the branch on `origin`. The checked-out profile cannot be
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::UnknownProfile`] for an undeclared profile,
    /// [`ConfigError::Invalid`] for the current profile, or git errors.
    pub fn delete_profile(&self, name: &str, remote: bool) -> Result<ProfileChange, FreckleError> {
        self.repo.ensure_exists()?;
        let profile = profiles::resolve(&self.ctx.config, name)?;
        if self.repo.current_branch().ok().as_deref() == Some(profile.branch.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "'{name}' is the current profile; switch to another one first"
            ))
            .into());
        }

        if self.ctx.dry_run {
            self.ctx
                .log
                .dry_run(&format!("would delete branch '{}'", profile.branch));
            if remote {
                self.ctx
                    .log
                    .dry_run(&format!("would delete origin/{}", profile.branch));
            }
            return Ok(ProfileChange {
                branch: profile.branch,
                ..ProfileChange::default()
            });
        }

        if self.repo.branch_exists(&profile.branch) {
            self.repo.delete_branch(&profile.branch)?;
        }
        profiles::remove_from_file(&self.ctx.config_path(), name)?;
        self.ctx.log.info(&format!("deleted profile '{name}'"));

        let propagated = match self.config_rel() {
            Some(rel) => {
                let branches: Vec<String> = self
                    .profile_branches()?
                    .into_iter()
                    .filter(|b| *b != profile.branch)
                    .collect();
                Some(self.propagate_files(&[rel], &branches, &format!("Remove profile: {name}"), false)?)
            }
            None => None,
        };

        let remote_warning = if remote && self.repo.remote_branch_exists(&profile.branch) {
            self.repo
                .delete_remote_branch(&profile.branch)
                .err()
                .map(|e| e.to_string())
        } else {
            None
        };
        Ok(ProfileChange {
            branch: profile.branch,
            propagated,
            remote_warning,
        })
    }

    /// Files that differ between the current branch and profile `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FreckleError::UnknownProfile`] if the branch does not exist.
    pub fn profile_diff(&self, name: &str) -> Result<Vec<String>, FreckleError> {
        self.repo.ensure_exists()?;
        let branch = self.branch_for(name);
        let target = if self.repo.branch_exists(&branch) {
            branch
        } else if self.repo.remote_branch_exists(&branch) {
            format!("origin/{branch}")
        } else {
            return Err(profiles::unknown_profile(name, &self.ctx.config.profile_names()));
        };
        Ok(self.repo.changed_between("HEAD", &target)?)
    }
}
