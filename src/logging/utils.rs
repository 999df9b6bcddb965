//! Utility functions for path resolution, ANSI stripping, and time formatting.
use std::fs;
use std::path::PathBuf;

/// Directory name used under the user's cache directory.
const APP_DIR: &str = "dotfiles-installer";

/// Strip ANSI escape sequences from a string.
///
/// Handles SGR sequences (ending in `m`) and other CSI sequences (ending
/// in any letter in the `@`..`~` range), so cursor movement, erase, etc.
/// are also stripped without consuming unrelated text.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if let Some(next) = chars.next()
                && next == '['
            {
                for inner in chars.by_ref() {
                    if ('@'..='~').contains(&inner) {
                        break;
                    }
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Leading whitespace for a message nested `depth` levels deep.
pub(super) fn indent_prefix(depth: usize) -> String {
    "  ".repeat(depth)
}

/// `$XDG_CACHE_HOME/dotfiles-installer`, or `~/.cache/dotfiles-installer`,
/// created on first use. `None` if it cannot be created.
pub(super) fn cache_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".cache"))
        })
        .unwrap_or_else(|| PathBuf::from(".cache"));
    let dir = base.join(APP_DIR);
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Return the log file path under the cache directory.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    Some(cache_dir()?.join(format!("{command}.log")))
}

/// Format the current UTC time as `YYYY-MM-DD HH:MM:SS`.
pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format the current UTC time as `HH:MM:SS`.
pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}
