//! Domain-specific error types for the installer.
//!
//! Internal modules return typed errors (e.g. [`ConfigError`], [`StageError`])
//! while stage bodies and command handlers work with [`anyhow::Error`] and
//! convert through the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ConfigError: conflicting filters, unknown stage names, settings file, identity
//! StageError: abort-on-error escalation, unresolvable dependencies
//! ToolError: a required executable is missing from PATH
//! PromptError: interactive input could not be obtained
//! ```

use thiserror::Error;

/// Errors raised while assembling the run configuration, before any stage runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Both a skip list and an only list were given.
    #[error("cannot set skip and only stage filters at the same time")]
    ConflictingFilters,

    /// A skip/only entry does not name a registered stage.
    #[error("unknown stage '{name}' (known stages: {known})")]
    UnknownStage {
        /// The flag name that was not found.
        name: String,
        /// Comma-separated list of registered flag names.
        known: String,
    },

    /// The current user could not be determined from the environment.
    #[error("cannot determine current user: {0}")]
    Identity(String),

    /// An I/O error occurred while reading the settings file.
    #[error("IO error reading settings file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or has unknown keys.
    #[error("invalid settings file {path}: {message}")]
    InvalidSyntax {
        /// Path to the offending file.
        path: String,
        /// Parser message.
        message: String,
    },
}

/// Errors that arise from stage execution and bookkeeping.
#[derive(Error, Debug)]
pub enum StageError {
    /// A stage marked abort-on-error failed; the run must stop.
    #[error("stage '{stage}' failed, aborting: {reason}")]
    Aborted {
        /// Display name of the failed stage.
        stage: String,
        /// Rendered failure chain.
        reason: String,
    },

    /// A declared dependency could not be resolved and was dropped.
    #[error("stage '{stage}' depends on unknown stage '{dependency}', ignoring it")]
    UnresolvedDependency {
        /// Display name of the declaring stage.
        stage: String,
        /// The dependency reference as written.
        dependency: String,
    },
}

/// Errors raised by executable discovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// A single executable could not be located on `PATH`.
    #[error("{name} executable not found")]
    NotFound {
        /// Executable name.
        name: String,
    },

    /// One or more required executables are missing.
    #[error("required tools not found: {names}")]
    MissingRequired {
        /// Comma-separated executable names.
        names: String,
    },
}

/// Errors raised while reading interactive input.
#[derive(Error, Debug)]
pub enum PromptError {
    /// Input ended before an answer was given and there is no default.
    #[error("end of input reached without an answer")]
    EndOfInput,

    /// The user kept giving invalid answers.
    #[error("no valid answer after {attempts} attempts")]
    TooManyAttempts {
        /// Number of attempts made.
        attempts: usize,
    },

    /// Reading from or writing to the terminal failed.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    // -----------------------------------------------------------------------
    // ConfigError
    // -----------------------------------------------------------------------

    #[test]
    fn config_error_conflicting_filters_display() {
        assert_eq!(
            ConfigError::ConflictingFilters.to_string(),
            "cannot set skip and only stage filters at the same time"
        );
    }

    #[test]
    fn config_error_unknown_stage_display() {
        let e = ConfigError::UnknownStage {
            name: "fonts".to_string(),
            known: "link-dotfiles, configure-git".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "unknown stage 'fonts' (known stages: link-dotfiles, configure-git)"
        );
    }

    #[test]
    fn config_error_io_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: "/home/me/.config/dotfiles-installer/config.toml".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(e.to_string().contains("config.toml"));
        assert!(e.source().is_some());
    }

    // -----------------------------------------------------------------------
    // StageError
    // -----------------------------------------------------------------------

    #[test]
    fn stage_error_aborted_display() {
        let e = StageError::Aborted {
            stage: "Check required tools".to_string(),
            reason: "required tools not found: zsh".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "stage 'Check required tools' failed, aborting: required tools not found: zsh"
        );
    }

    #[test]
    fn stage_error_unresolved_dependency_display() {
        let e = StageError::UnresolvedDependency {
            stage: "Link dotfiles".to_string(),
            dependency: "install-fonts".to_string(),
        };
        assert!(e.to_string().contains("install-fonts"));
        assert!(e.to_string().contains("ignoring"));
    }

    // -----------------------------------------------------------------------
    // ToolError / PromptError
    // -----------------------------------------------------------------------

    #[test]
    fn tool_error_not_found_display() {
        let e = ToolError::NotFound {
            name: "zsh".to_string(),
        };
        assert_eq!(e.to_string(), "zsh executable not found");
    }

    #[test]
    fn prompt_error_from_io() {
        let e: PromptError = io::Error::new(io::ErrorKind::BrokenPipe, "closed").into();
        assert!(matches!(e, PromptError::Io(_)));
    }

    // -----------------------------------------------------------------------
    // Send + Sync bounds and anyhow conversion
    // -----------------------------------------------------------------------

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<ConfigError>();
        assert_send_sync::<StageError>();
        assert_send_sync::<ToolError>();
        assert_send_sync::<PromptError>();
    }

    #[test]
    fn tool_error_converts_to_anyhow_and_back() {
        let e: anyhow::Error = ToolError::NotFound {
            name: "git".to_string(),
        }
        .into();
        assert!(e.downcast_ref::<ToolError>().is_some());
    }
}
