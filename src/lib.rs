//! Dotfiles manager built on a bare git repository.
//!
//! The home directory is the work tree of a bare repository (default
//! `~/.dotfiles`); profiles are branches. Files in the way of a checkout are
//! moved into timestamped restore points instead of being overwritten, and
//! a secret scanner guards `add`.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load and validate `~/.freckle.yaml`
//! - **[`repo`]**: typed adapter over `git --git-dir … --work-tree $HOME`
//! - **[`restore`]**: restore points and the conflict resolver
//! - **[`manager`]**: sync, backup, update, profiles, propagate, doctor
//! - **[`tools`]**: tool probes and installs across package managers
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod logging;
pub mod manager;
pub mod platform;
pub mod repo;
pub mod restore;
pub mod schedule;
pub mod secrets;
pub mod tools;
