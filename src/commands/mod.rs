//! Top-level command orchestration shared by `install` and `--list`.
pub mod install;
pub mod list;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::Cli;
use crate::config::Settings;
use crate::dotfiles::DotfileManager;
use crate::error::ConfigError;
use crate::logging::Log;
use crate::platform::Platform;
use crate::stages::StageRegistry;
use crate::stages::builtin::{self, Environment};

/// Resolve the repository root from `--root`, `DOTFILES_ROOT`, or the
/// current directory, in that order.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn resolve_root(cli: &Cli) -> Result<PathBuf> {
    if let Some(root) = &cli.root {
        return Ok(root.clone());
    }
    if let Some(root) = std::env::var_os("DOTFILES_ROOT").filter(|r| !r.is_empty()) {
        return Ok(PathBuf::from(root));
    }
    std::env::current_dir().context("cannot determine current directory; use --root")
}

/// The user's home directory from `HOME` (or `USERPROFILE` on Windows).
///
/// # Errors
///
/// Returns an error if neither variable is set.
pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .context("cannot determine home directory: HOME is not set")
}

/// Load the settings file named by `--config`, or the default one.
///
/// A missing default file yields empty settings; a missing explicit file is
/// an error.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    match &cli.config {
        Some(path) if !path.exists() => Err(ConfigError::Io {
            path: path.display().to_string(),
            source: std::io::ErrorKind::NotFound.into(),
        }),
        Some(path) => Settings::load(path),
        None => Settings::default_path()
            .map_or_else(|| Ok(Settings::default()), |p| Settings::load(&p)),
    }
}

/// Build the run environment for the built-in stages.
///
/// `timestamp` names every backup made during the run.
///
/// # Errors
///
/// Returns an error if the root or home directory cannot be determined.
pub fn environment(
    cli: &Cli,
    timestamp: &chrono::DateTime<chrono::Local>,
    log: &Arc<dyn Log>,
) -> Result<Arc<Environment>> {
    Ok(Arc::new(Environment {
        root: resolve_root(cli)?,
        home: home_dir()?,
        dotfiles: Arc::new(DotfileManager::new(timestamp, Arc::clone(log))),
        log: Arc::clone(log),
    }))
}

/// Register every built-in stage for `platform` and resolve dependencies.
pub fn build_registry(
    platform: Platform,
    environment: &Arc<Environment>,
    log: &Arc<dyn Log>,
) -> StageRegistry {
    let mut registry = StageRegistry::new(platform, Arc::clone(log));
    builtin::register_all(&mut registry, environment);
    registry.resolve_dependencies();
    registry
}
