#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration tests for `backup`: commit scope and the push decision table.

mod common;

use std::sync::Arc;

use common::{TestEnv, TestEnvBuilder};
use freckle::cli::BackupOpts;
use freckle::commands::CommandSetup;
use freckle::logging::{Log, Logger};
use freckle::manager::{DotfilesManager, PushOutcome};
use freckle::repo::PushPlan;

fn synced() -> TestEnv {
    let env = TestEnvBuilder::new()
        .remote_branch("main", &[(".zshrc", "v1\n")])
        .build();
    DotfilesManager::new(&env.context()).sync().unwrap();
    env
}

#[test]
fn first_backup_after_empty_clone_sets_upstream() {
    let env = TestEnvBuilder::new().build();
    let ctx = env.context();
    let manager = DotfilesManager::new(&ctx);
    manager.sync().unwrap();
    env.write_home(".zshrc", "first\n");
    manager
        .add(&[".zshrc".to_string()], &env.home(), false)
        .unwrap();

    let report = manager.backup(Some("first backup"), true).unwrap();

    assert!(report.committed);
    assert_eq!(report.push, PushOutcome::Done(PushPlan::SetUpstream));
    assert_eq!(
        env.remote_git(&["log", "-1", "--format=%s", "main"]),
        "first backup"
    );
}

#[test]
fn backup_commits_tracked_changes_only_and_fast_forwards() {
    let env = synced();
    env.write_home(".zshrc", "v2\n");
    env.write_home(".untracked-secret", "token\n");
    let ctx = env.context();

    let report = DotfilesManager::new(&ctx)
        .backup(Some("tweak zshrc"), true)
        .unwrap();

    assert_eq!(report.files, vec![".zshrc"]);
    assert_eq!(report.message, "tweak zshrc");
    assert_eq!(report.push, PushOutcome::Done(PushPlan::FastForward { ahead: 1 }));
    assert_eq!(
        env.remote_git(&["show", "main:.zshrc"]),
        "v2"
    );
    let files = env.remote_git(&["ls-tree", "-r", "--name-only", "main"]);
    assert!(!files.contains(".untracked-secret"));
}

#[test]
fn backup_without_changes_makes_no_commit() {
    let env = synced();
    let head = env.dotfiles_git(&["rev-parse", "HEAD"]);
    let report = DotfilesManager::new(&env.context())
        .backup(None, true)
        .unwrap();
    assert!(!report.committed);
    assert!(report.message.starts_with("Backup from "));
    assert_eq!(report.push, PushOutcome::Done(PushPlan::UpToDate));
    assert_eq!(env.dotfiles_git(&["rev-parse", "HEAD"]), head);
}

#[test]
fn diverged_backup_keeps_local_commit_and_never_forces() {
    let env = synced();
    env.remote_commit("main", &[(".vimrc", "remote\n")], "remote change");
    let remote_head = env.remote_git(&["rev-parse", "main"]);
    env.write_home(".zshrc", "local\n");

    let report = DotfilesManager::new(&env.context())
        .backup(Some("local change"), true)
        .unwrap();

    assert!(report.committed);
    assert_eq!(
        report.push,
        PushOutcome::Blocked(PushPlan::Diverged { ahead: 1, behind: 1 })
    );
    assert_eq!(
        env.dotfiles_git(&["log", "-1", "--format=%s"]),
        "local change"
    );
    assert_eq!(env.remote_git(&["rev-parse", "main"]), remote_head);
}

#[test]
fn backup_command_fails_when_push_is_blocked() {
    let env = synced();
    env.remote_commit("main", &[(".vimrc", "remote\n")], "remote change");
    let remote_head = env.remote_git(&["rev-parse", "main"]);
    env.write_home(".zshrc", "local\n");
    let logger = Arc::new(Logger::new("backup"));
    let ctx = env
        .context()
        .with_log(Arc::clone(&logger) as Arc<dyn Log>);
    let setup = CommandSetup { ctx, log: logger };
    let opts = BackupOpts {
        message: Some("nightly".to_string()),
        no_push: false,
        quiet: true,
    };

    let err = freckle::commands::repo::backup(&setup, &opts).unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("not pushed"), "{msg}");
    assert!(msg.contains("diverged"), "{msg}");
    assert_eq!(env.dotfiles_git(&["log", "-1", "--format=%s"]), "nightly");
    assert_eq!(env.remote_git(&["rev-parse", "main"]), remote_head);
}

#[test]
fn behind_backup_reports_pull_first() {
    let env = synced();
    env.remote_commit("main", &[(".vimrc", "remote\n")], "remote change");

    let report = DotfilesManager::new(&env.context())
        .backup(None, true)
        .unwrap();

    assert!(!report.committed);
    let PushOutcome::Blocked(plan) = report.push else {
        panic!("expected a blocked push, got {:?}", report.push);
    };
    assert_eq!(plan, PushPlan::Behind { behind: 1 });
    assert!(plan.blocked_reason().is_some());
}

#[test]
fn no_push_skips_the_network() {
    let env = synced();
    env.write_home(".zshrc", "v2\n");
    let remote_head = env.remote_git(&["rev-parse", "main"]);
    let report = DotfilesManager::new(&env.context())
        .backup(Some("offline"), false)
        .unwrap();
    assert!(report.committed);
    assert_eq!(report.push, PushOutcome::Skipped);
    assert_eq!(env.remote_git(&["rev-parse", "main"]), remote_head);
}

#[test]
fn dry_run_backup_commits_nothing() {
    let env = synced();
    env.write_home(".zshrc", "v2\n");
    let head = env.dotfiles_git(&["rev-parse", "HEAD"]);
    let report = DotfilesManager::new(&env.dry_run_context())
        .backup(Some("dry"), true)
        .unwrap();
    assert_eq!(report.files, vec![".zshrc"]);
    assert!(!report.committed);
    assert_eq!(env.dotfiles_git(&["rev-parse", "HEAD"]), head);
    assert!(env.log.contains("would commit ~/.zshrc"));
}
