//! Read-only health check.
use std::collections::BTreeMap;
use std::fmt;

use super::DotfilesManager;
use crate::config::profiles;
use crate::repo::PushPlan;
use crate::tools::ToolRegistry;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Something is broken; `doctor` exits non-zero.
    Issue,
    /// Worth a look, but freckle works.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Issue => "issue",
            Self::Warning => "warning",
        })
    }
}

/// One doctor finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Severity.
    pub severity: Severity,
    /// Check that produced it (e.g. "repository").
    pub check: &'static str,
    /// What is wrong.
    pub message: String,
    /// What to run about it.
    pub suggestion: Option<String>,
}

impl Finding {
    fn issue(check: &'static str, message: impl Into<String>, suggestion: Option<&str>) -> Self {
        Self {
            severity: Severity::Issue,
            check,
            message: message.into(),
            suggestion: suggestion.map(String::from),
        }
    }

    fn warning(check: &'static str, message: impl Into<String>, suggestion: Option<&str>) -> Self {
        Self {
            severity: Severity::Warning,
            check,
            message: message.into(),
            suggestion: suggestion.map(String::from),
        }
    }
}

/// Outcome of `doctor`.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    /// Checks that passed, as short descriptions.
    pub passed: Vec<String>,
    /// Problems found.
    pub findings: Vec<Finding>,
}

impl DoctorReport {
    /// Whether any finding is an [`Severity::Issue`].
    #[must_use]
    pub fn has_issues(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Issue)
    }

    fn pass(&mut self, what: impl Into<String>) {
        self.passed.push(what.into());
    }
}

impl DotfilesManager<'_> {
    /// Run every check. Never mutates the repository, the work tree or the
    /// config; the remote is not contacted.
    ///
    /// `expected_branch` is the branch the active profile should be on.
    #[must_use]
    pub fn doctor(&self, expected_branch: &str) -> DoctorReport {
        let mut report = DoctorReport::default();
        self.check_git(&mut report);
        self.check_config(&mut report);
        if self.check_repository(&mut report) {
            self.check_branch(&mut report, expected_branch);
            self.check_changes(&mut report);
            self.check_remote(&mut report);
            self.check_alignment(&mut report);
        }
        self.check_tools(&mut report);
        report
    }

    fn check_git(&self, report: &mut DoctorReport) {
        if self.ctx.executor.which("git") {
            report.pass("git is installed");
        } else {
            report.findings.push(Finding::issue(
                "prerequisites",
                "git is not installed",
                Some("install git with your package manager"),
            ));
        }
    }

    fn check_config(&self, report: &mut DoctorReport) {
        let config = &self.ctx.config;
        if config.source.is_none() {
            report.findings.push(Finding::warning(
                "config",
                format!("no config file at {}", self.ctx.config_path().display()),
                Some("run `freckle init`"),
            ));
            return;
        }
        let warnings = config.validate();
        if warnings.is_empty() {
            report.pass(format!("config is valid ({} profile(s))", config.profiles.len()));
        }
        for w in warnings {
            report.findings.push(Finding::warning(
                "config",
                w.to_string(),
                Some("run `freckle config check`"),
            ));
        }
    }

    fn check_repository(&self, report: &mut DoctorReport) -> bool {
        if self.repo.exists() {
            report.pass(format!("repository at {}", self.repo.git_dir().display()));
            true
        } else {
            report.findings.push(Finding::issue(
                "repository",
                format!("no repository at {}", self.repo.git_dir().display()),
                Some("run `freckle init` or `freckle sync`"),
            ));
            false
        }
    }

    fn check_branch(&self, report: &mut DoctorReport, expected: &str) {
        match self.repo.current_branch() {
            Ok(branch) if branch == expected => {
                report.pass(format!("on branch '{branch}'"));
            }
            Ok(branch) => {
                let hint = profiles::for_branch(&self.ctx.config, expected)
                    .map_or_else(|| format!("run `freckle profile switch {expected}`"), |p| {
                        format!("run `freckle profile switch {}`", p.name)
                    });
                report.findings.push(Finding::warning(
                    "branch",
                    format!("on branch '{branch}', expected '{expected}'"),
                    Some(&hint),
                ));
            }
            Err(_) => report.findings.push(Finding::issue(
                "branch",
                "HEAD is detached",
                Some("run `freckle profile switch <profile>`"),
            )),
        }
    }

    fn check_changes(&self, report: &mut DoctorReport) {
        match self.repo.changed_files() {
            Ok(files) if files.is_empty() => report.pass("no uncommitted changes"),
            Ok(files) => report.findings.push(Finding::warning(
                "changes",
                format!("{} tracked file(s) have uncommitted changes", files.len()),
                Some("run `freckle backup`"),
            )),
            Err(e) => report
                .findings
                .push(Finding::issue("changes", e.to_string(), None)),
        }
    }

    fn check_remote(&self, report: &mut DoctorReport) {
        if !self.repo.has_remote() {
            report.findings.push(Finding::warning(
                "remote",
                "no remote configured; backups stay local",
                Some("set dotfiles.repo_url and run `freckle init`"),
            ));
            return;
        }
        let Ok(branch) = self.repo.current_branch() else {
            return;
        };
        let state = match self.repo.ref_state(&branch) {
            Ok(s) => s,
            Err(e) => {
                report
                    .findings
                    .push(Finding::issue("remote", e.to_string(), None));
                return;
            }
        };
        match PushPlan::from_state(state) {
            PushPlan::UpToDate => report.pass("in sync with origin"),
            PushPlan::NoCommits => {}
            PushPlan::SetUpstream => report.findings.push(Finding::warning(
                "remote",
                format!("'{branch}' has never been pushed"),
                Some("run `freckle backup`"),
            )),
            PushPlan::FastForward { ahead } => report.findings.push(Finding::warning(
                "remote",
                format!("{ahead} local commit(s) not pushed"),
                Some("run `freckle backup`"),
            )),
            PushPlan::Behind { behind } => report.findings.push(Finding::warning(
                "remote",
                format!("{behind} remote commit(s) not pulled (as of the last fetch)"),
                Some("run `freckle update`"),
            )),
            PushPlan::Diverged { ahead, behind } => report.findings.push(Finding::issue(
                "remote",
                format!("diverged from origin ({ahead} ahead, {behind} behind)"),
                Some("resolve with `freckle log` and `freckle diff`"),
            )),
        }
    }

    /// Tool config files (and the freckle config itself) should be identical
    /// on every profile branch.
    fn check_alignment(&self, report: &mut DoctorReport) {
        let Ok(branches) = self.profile_branches() else {
            return;
        };
        if branches.len() < 2 {
            return;
        }
        let mut files = self.ctx.config.tool_config_files();
        if let Ok(rel) = self.ctx.config_path().strip_prefix(&self.ctx.home) {
            files.push(rel.to_string_lossy().to_string());
        }
        let mut misaligned = 0;
        for file in &files {
            let mut by_blob: BTreeMap<String, Vec<&str>> = BTreeMap::new();
            for branch in &branches {
                let reference = if self.repo.branch_exists(branch) {
                    branch.clone()
                } else {
                    format!("origin/{branch}")
                };
                let blob = self
                    .repo
                    .resolve(&format!("{reference}:{file}"))
                    .unwrap_or_else(|| "<missing>".to_string());
                by_blob.entry(blob).or_default().push(branch);
            }
            if by_blob.len() > 1 {
                misaligned += 1;
                let groups: Vec<String> = by_blob.values().map(|b| b.join("+")).collect();
                report.findings.push(Finding::warning(
                    "alignment",
                    format!("{file} differs across branches ({})", groups.join(" vs ")),
                    Some(&format!("run `freckle config propagate {file}`")),
                ));
            }
        }
        if misaligned == 0 {
            report.pass(format!(
                "{} shared file(s) aligned across {} branches",
                files.len(),
                branches.len()
            ));
        }
    }

    fn check_tools(&self, report: &mut DoctorReport) {
        let registry = ToolRegistry::new(self.ctx);
        let profile = self
            .repo
            .current_branch()
            .ok()
            .and_then(|b| profiles::for_branch(&self.ctx.config, &b));
        let Ok(names) = registry.select(&[], profile.as_ref(), profile.is_none()) else {
            return;
        };
        if names.is_empty() {
            return;
        }
        let statuses = registry.status(names);
        let missing: Vec<&str> = statuses
            .iter()
            .filter(|s| !s.installed)
            .map(|s| s.name.as_str())
            .collect();
        for name in &missing {
            report.findings.push(Finding::warning(
                "tools",
                format!("{name} is not installed"),
                Some(&format!("run `freckle tools install {name}`")),
            ));
        }
        let installed = statuses.len() - missing.len();
        if installed > 0 {
            report.pass(format!("{installed} tool(s) installed"));
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::config::Config;
    use crate::context::Context;
    use crate::logging::MemoryLog;
    use crate::platform::{Os, Platform};
    use crate::tools::test_helpers::MockExecutor;

    fn ctx(config: &str, exec: MockExecutor) -> Context {
        Context::new(
            Arc::new(Config::from_yaml_str(config, "u").unwrap()),
            Arc::new(Platform::new(Os::Linux, true)),
            Arc::new(MemoryLog::default()),
            PathBuf::from("/nonexistent/home"),
            Arc::new(exec),
        )
    }

    #[test]
    fn missing_repository_is_an_issue() {
        let ctx = ctx("dotfiles:\n  repo_url: https://x/y.git\n", MockExecutor::ok("").with_which(true));
        let report = DotfilesManager::new(&ctx).doctor("main");
        assert!(report.has_issues());
        assert!(report.findings.iter().any(|f| f.check == "repository"));
        assert!(report.passed.iter().any(|p| p == "git is installed"));
    }

    #[test]
    fn missing_git_and_tools_are_reported() {
        let ctx = ctx(
            "profiles:\n  main:\n    tools: [rg]\ntools:\n  rg:\n    apt: ripgrep\n",
            MockExecutor::ok("").with_which(false),
        );
        let report = DotfilesManager::new(&ctx).doctor("main");
        let git = report.findings.iter().find(|f| f.check == "prerequisites").unwrap();
        assert_eq!(git.severity, Severity::Issue);
        assert!(
            report
                .findings
                .iter()
                .any(|f| f.check == "tools" && f.message == "rg is not installed")
        );
    }

    #[test]
    fn warnings_alone_are_not_issues() {
        let report = DoctorReport {
            passed: Vec::new(),
            findings: vec![Finding::warning("x", "y", None)],
        };
        assert!(!report.has_issues());
    }
}
