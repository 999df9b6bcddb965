//! Tracing-backed implementation of [`Log`].
use std::path::PathBuf;

use super::subscriber::STAGE_TARGET;
use super::types::Log;
use super::utils::log_file_path;

/// Implement the methods of [`Log`] by delegating to inherent methods of the
/// same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger emitting [`tracing`] events.
///
/// All messages are always written to a persistent log file at
/// `$XDG_CACHE_HOME/dotfiles-installer/<command>.log` (default
/// `~/.cache/dotfiles-installer/<command>.log`) with timestamps and ANSI
/// codes stripped, regardless of the verbose flag.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary. The log file
    /// itself is created by [`init_subscriber`](super::init_subscriber); this
    /// constructor does not write to the file.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error);
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    fn contents(log: &Logger) -> String {
        let path = log.log_path().expect("log path should exist");
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn log_file_is_created() {
        let (log, _tmp, _guard) = isolated_logger();
        let path = log.log_path().expect("log path should exist");
        assert!(path.exists(), "log file should be created with the layer");
        assert!(contents(&log).contains("dotfiles-installer"));
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let text = contents(&log);
        assert!(text.contains("[debug]"));
        assert!(
            text.contains(&marker),
            "debug messages should always appear in the log file"
        );
    }

    #[test]
    fn warn_and_error_are_tagged() {
        let (log, _tmp, _guard) = isolated_logger();
        log.warn("warn-marker");
        log.error("error-marker");
        let text = contents(&log);
        assert!(text.contains("[warn] warn-marker"));
        assert!(text.contains("[error] error-marker"));
    }

    #[test]
    fn stage_written_to_file_with_arrow() {
        let (log, _tmp, _guard) = isolated_logger();
        log.stage("Configure git ...");
        assert!(contents(&log).contains("==> Configure git ..."));
    }

    #[test]
    fn indent_nests_file_lines_and_restores() {
        let (log, _tmp, _guard) = isolated_logger();
        let log_ref: &dyn Log = &log;
        log_ref.info("before");
        {
            let _indent = log_ref.indent();
            log_ref.info("nested");
        }
        log_ref.info("after");

        let text = contents(&log);
        let line = |marker: &str| {
            text.lines()
                .find(|l| l.ends_with(marker))
                .map(|l| l.split_once("] ").unwrap().1.to_string())
                .unwrap()
        };
        assert_eq!(line("before"), "    before");
        assert_eq!(line("nested"), "      nested");
        assert_eq!(line("after"), "    after");
    }

    #[test]
    fn ansi_codes_stripped_from_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.info("\x1b[32mgreen\x1b[0m text");
        let text = contents(&log);
        assert!(text.contains("green text"));
        assert!(!text.contains('\x1b'));
    }
}
