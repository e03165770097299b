//! System bootstrap and dotfile maintenance engine.
//!
//! Brings a Debian-family Linux machine to a declared state: catalog
//! packages, release binaries from GitHub, configuration blocks merged into
//! dotfiles without clobbering user edits, `key value` settings in system
//! files, `nofail` fstab mounts, timezone and sleep targets. Everything is
//! driven by TOML files in `conf/` and every step is idempotent.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load and validate TOML config files
//! - **[`merge`]**: entry-aware merging of a block into existing text
//! - **[`resources`]**: idempotent `check + apply` primitives
//! - **[`tasks`]**: named, dependency-ordered units of work wired to resources
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod merge;
pub mod platform;
pub mod resources;
pub mod tasks;
