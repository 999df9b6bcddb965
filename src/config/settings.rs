//! Optional TOML settings file supplying defaults for the CLI flags.
//!
//! ```toml
//! [stages]
//! skip = ["generate-ssh-key"]
//! confirm_all = false
//!
//! [user]
//! email = "jane@example.com"
//! ```
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Contents of the settings file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Stage selection defaults.
    pub stages: StageSettings,
    /// Identity defaults.
    pub user: UserSettings,
}

/// The `[stages]` table.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageSettings {
    /// Flag names to skip.
    pub skip: Vec<String>,
    /// Flag names to run exclusively.
    pub only: Vec<String>,
    /// Run interactive stages without asking.
    pub confirm_all: bool,
}

/// The `[user]` table.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserSettings {
    /// Email address used by stages that need one.
    pub email: Option<String>,
}

impl Settings {
    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSyntax`] if the text is not valid TOML or
    /// contains unknown keys.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidSyntax {
            path: path.display().to_string(),
            message: e.message().to_string(),
        })
    }

    /// Load settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Default settings file location:
    /// `$XDG_CONFIG_HOME/dotfiles-installer/config.toml`, falling back to
    /// `~/.config/dotfiles-installer/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        let config_dir = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME")
                    .or_else(|| std::env::var_os("USERPROFILE"))
                    .map(|home| PathBuf::from(home).join(".config"))
            })?;
        Some(config_dir.join("dotfiles-installer").join("config.toml"))
    }

    /// Combine these settings with values given on the command line.
    ///
    /// CLI filters replace the file's filters as a pair, so a file-level
    /// `skip` never collides with a CLI `--only`. `--yes` can only enable
    /// confirm-all, and `--email` wins over the file.
    #[must_use]
    pub fn merge_cli(
        self,
        skip: &[String],
        only: &[String],
        confirm_all: bool,
        email: Option<&str>,
    ) -> Self {
        let (skip, only) = if skip.is_empty() && only.is_empty() {
            (self.stages.skip, self.stages.only)
        } else {
            (skip.to_vec(), only.to_vec())
        };
        Self {
            stages: StageSettings {
                skip,
                only,
                confirm_all: confirm_all || self.stages.confirm_all,
            },
            user: UserSettings {
                email: email.map(String::from).or(self.user.email),
            },
        }
    }
}
