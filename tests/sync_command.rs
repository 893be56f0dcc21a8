#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration tests for `init` and `sync` against a real git binary.

mod common;

use common::TestEnvBuilder;
use freckle::error::{ConfigError, FreckleError};
use freckle::manager::{DotfilesManager, RepoState, SyncOutcome};

#[test]
fn sync_clones_and_checks_out_files() {
    let env = TestEnvBuilder::new()
        .remote_branch("main", &[(".zshrc", "export EDITOR=vim\n"), (".config/nvim/init.lua", "-- nvim\n")])
        .build();
    let ctx = env.context();
    let outcome = DotfilesManager::new(&ctx).sync().unwrap();

    let SyncOutcome::Cloned(report) = outcome else {
        panic!("expected a clone, got {outcome:?}");
    };
    assert_eq!(report.branch, "main");
    assert!(report.resolution.point.is_none());
    assert_eq!(env.read_home(".zshrc"), "export EDITOR=vim\n");
    assert_eq!(env.read_home(".config/nvim/init.lua"), "-- nvim\n");
    assert!(ctx.restore_points().list().unwrap().is_empty());
}

#[test]
fn second_sync_moves_nothing() {
    let env = TestEnvBuilder::new()
        .remote_branch("main", &[(".zshrc", "remote\n")])
        .build();
    let ctx = env.context();
    let manager = DotfilesManager::new(&ctx);
    manager.sync().unwrap();
    let head = env.dotfiles_git(&["rev-parse", "HEAD"]);

    let again = manager.sync().unwrap();
    let SyncOutcome::Existing(status) = again else {
        panic!("expected a status report, got {again:?}");
    };
    assert_eq!(status.state, RepoState::Clean);
    assert_eq!(status.branch.as_deref(), Some("main"));
    assert!(ctx.restore_points().list().unwrap().is_empty());
    assert_eq!(env.read_home(".zshrc"), "remote\n");
    assert_eq!(env.dotfiles_git(&["rev-parse", "HEAD"]), head);
}

#[test]
fn sync_moves_existing_file_into_restore_point() {
    let env = TestEnvBuilder::new()
        .remote_branch("main", &[(".zshrc", "remote\n"), (".vimrc", "set nu\n")])
        .build();
    env.write_home(".zshrc", "mine\n");
    // Identical content is not a conflict.
    env.write_home(".vimrc", "set nu\n");
    let ctx = env.context();
    let SyncOutcome::Cloned(report) = DotfilesManager::new(&ctx).sync().unwrap() else {
        panic!("expected a clone");
    };

    assert_eq!(report.resolution.moved, vec![".zshrc"]);
    assert_eq!(env.read_home(".zshrc"), "remote\n");
    let points = ctx.restore_points().list().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(
        std::fs::read_to_string(points[0].stored_path(".zshrc")).unwrap(),
        "mine\n"
    );
}

#[test]
fn sync_without_url_fails_before_touching_anything() {
    let env = TestEnvBuilder::new().without_url().build();
    let ctx = env.context();
    let err = DotfilesManager::new(&ctx).sync().unwrap_err();
    assert!(matches!(err, FreckleError::Config(ConfigError::MissingRepoUrl)));
    assert!(err.hint().unwrap().contains("repo_url"));
    assert!(!env.home().join(".dotfiles").exists());
}

#[test]
fn sync_dry_run_plans_clone() {
    let env = TestEnvBuilder::new()
        .remote_branch("main", &[(".zshrc", "remote\n")])
        .build();
    let ctx = env.dry_run_context();
    let outcome = DotfilesManager::new(&ctx).sync().unwrap();
    assert!(matches!(outcome, SyncOutcome::Planned(ref p) if p.starts_with("clone ")));
    assert!(!env.home().join(".dotfiles").exists());
    assert!(!env.home().join(".zshrc").exists());
}

#[test]
fn init_without_url_creates_repository() {
    let env = TestEnvBuilder::new().without_url().build();
    let ctx = env.context();
    let manager = DotfilesManager::new(&ctx);
    let outcome = manager.init(None).unwrap();
    assert!(matches!(outcome, SyncOutcome::Created { ref branch } if branch == "main"));
    assert_eq!(manager.repo().current_branch().unwrap(), "main");
    // The config file is the first tracked file.
    assert!(manager.repo().is_tracked(".freckle.yaml"));
    assert!(matches!(manager.init(None).unwrap(), SyncOutcome::AlreadyInitialized));
}

#[test]
fn clone_of_empty_remote_waits_for_first_backup() {
    let env = TestEnvBuilder::new().build();
    let ctx = env.context();
    let SyncOutcome::Cloned(report) = DotfilesManager::new(&ctx).sync().unwrap() else {
        panic!("expected a clone");
    };
    assert_eq!(report.branch, "main");
    assert!(report.note.unwrap().contains("empty"));
}

#[test]
fn current_branch_follows_out_of_band_checkout() {
    let env = TestEnvBuilder::new()
        .remote_branch("main", &[(".zshrc", "main\n")])
        .remote_branch("work", &[(".zshrc", "work\n")])
        .build();
    let ctx = env.context();
    let manager = DotfilesManager::new(&ctx);
    manager.sync().unwrap();
    assert_eq!(manager.repo().current_branch().unwrap(), "main");

    env.dotfiles_git(&["checkout", "--quiet", "work"]);

    assert_eq!(manager.repo().current_branch().unwrap(), "work");
    assert_eq!(manager.status(false).unwrap().branch.as_deref(), Some("work"));
    assert_eq!(env.read_home(".zshrc"), "work\n");
}
