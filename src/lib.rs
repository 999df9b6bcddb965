//! Staged personal-machine setup.
//!
//! A run is a fixed, ordered list of named stages. Each stage can be skipped
//! from the command line, gated by a predicate, confirmed interactively, and
//! marked to abort the whole run when it fails. File materialization goes
//! through [`dotfiles::DotfileManager`], which backs up whatever it replaces.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: the immutable per-run [`config::RunConfig`] and the
//!   optional settings file
//! - **[`stages`]**: stage definitions, the registry that runs them, and the
//!   built-in catalogue
//! - **[`dotfiles`]**: safe symlink and write primitives with backups
//! - **[`commands`]**: the `install` and `--list` entry points
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod dotfiles;
pub mod error;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod platform;
pub mod prompt;
pub mod stages;
pub mod tools;
