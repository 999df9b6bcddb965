//! Symlink and write files without silently destroying what was there.
//!
//! Every mutation goes through [`DotfileManager::cleanup_path`] first: an
//! existing symlink is removed (it is only a pointer), an existing regular
//! file is renamed to a timestamped backup next to it.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{DateTime, TimeZone};

use crate::fs::create_symlink;
use crate::logging::Log;

/// Prefix of the suffix appended to backed-up files.
pub const BACKUP_SUFFIX_PREFIX: &str = ".pre-dotfiles-installer-";

/// `strftime` format of the timestamp in backup names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Result of a materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    /// The destination already had the desired content; nothing was touched.
    UpToDate,
    /// The destination was (re)created.
    Written {
        /// Final destination path.
        path: PathBuf,
        /// Where the previous regular file was moved, if there was one.
        backup: Option<PathBuf>,
    },
}

/// Creates symlinks and files, backing up whatever regular file was in the way.
pub struct DotfileManager {
    backup_suffix: String,
    log: Arc<dyn Log>,
}

impl std::fmt::Debug for DotfileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DotfileManager")
            .field("backup_suffix", &self.backup_suffix)
            .finish_non_exhaustive()
    }
}

impl DotfileManager {
    /// Create a manager whose backups are named after `timestamp`.
    #[must_use]
    pub fn new<Tz>(timestamp: &DateTime<Tz>, log: Arc<dyn Log>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            backup_suffix: format!(
                "{BACKUP_SUFFIX_PREFIX}{}",
                timestamp.format(BACKUP_TIMESTAMP_FORMAT)
            ),
            log,
        }
    }

    /// Suffix appended to backed-up file names, e.g.
    /// `.pre-dotfiles-installer-2024-01-02_03-04-05`.
    #[must_use]
    pub fn backup_suffix(&self) -> &str {
        &self.backup_suffix
    }

    /// Backup location for `path`: same directory, name plus suffix.
    #[must_use]
    pub fn backup_path(&self, path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(&self.backup_suffix);
        path.with_file_name(name)
    }

    /// Clear `path` for a new file or link.
    ///
    /// A symlink is removed (its target is left alone) and `None` returned.
    /// A regular file is renamed to [`backup_path`](Self::backup_path) and
    /// the backup location returned. Anything else is left in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be removed or the file renamed.
    pub fn cleanup_path(&self, path: &Path) -> Result<Option<PathBuf>> {
        let Ok(metadata) = path.symlink_metadata() else {
            return Ok(None);
        };

        if metadata.is_symlink() {
            let target = std::fs::read_link(path)
                .with_context(|| format!("reading symlink {}", path.display()))?;
            self.log.info(&format!(
                "Remove symlink of {} to {}",
                path.display(),
                target.display()
            ));
            std::fs::remove_file(path)
                .with_context(|| format!("removing symlink {}", path.display()))?;
            return Ok(None);
        }

        if metadata.is_file() {
            let backup = self.backup_path(path);
            self.log.info(&format!(
                "Rename existing {} file to {}",
                path.file_name().unwrap_or_default().to_string_lossy(),
                backup.display()
            ));
            std::fs::rename(path, &backup).with_context(|| {
                format!("renaming {} to {}", path.display(), backup.display())
            })?;
            return Ok(Some(backup));
        }

        Ok(None)
    }

    /// Make `destination` a symlink to `source`.
    ///
    /// When `destination` is a directory the link is created inside it,
    /// named after `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be cleared or the link
    /// cannot be created.
    pub fn safe_symlink(&self, source: &Path, destination: &Path) -> Result<Materialized> {
        let destination = match source.file_name() {
            Some(name) if destination.is_dir() => destination.join(name),
            _ => destination.to_path_buf(),
        };

        let backup = self.cleanup_path(&destination)?;
        self.log.info(&format!(
            "Create symlink from {} to {}",
            destination.display(),
            source.display()
        ));
        create_symlink(source, &destination)?;
        Ok(Materialized::Written {
            path: destination,
            backup,
        })
    }

    /// Make `destination` a regular file containing exactly `text`.
    ///
    /// A regular file that already holds `text` is left untouched, so
    /// repeating the call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be read, cleared or written.
    pub fn safe_write(&self, text: &str, destination: &Path) -> Result<Materialized> {
        if content_matches(text, destination)? {
            self.log.info(&format!("{} is up-to-date", destination.display()));
            return Ok(Materialized::UpToDate);
        }
        self.log.info(&format!(
            "{} differs from desired content",
            destination.display()
        ));
        if let Ok(current) = std::fs::read_to_string(destination) {
            for line in content_diff(&current, text) {
                self.log.debug(&line);
            }
        }

        let backup = self.cleanup_path(destination)?;
        self.log.info(&format!("Write {}", destination.display()));
        std::fs::write(destination, text)
            .with_context(|| format!("writing {}", destination.display()))?;
        Ok(Materialized::Written {
            path: destination.to_path_buf(),
            backup,
        })
    }
}

/// Changed lines between `old` and `new`, prefixed `- ` or `+ ` and colored.
fn content_diff(old: &str, new: &str) -> Vec<String> {
    similar::TextDiff::from_lines(old, new)
        .iter_all_changes()
        .filter_map(|change| {
            let line = change.value().trim_end_matches('\n');
            match change.tag() {
                similar::ChangeTag::Delete => Some(format!("\x1b[31m- {line}\x1b[0m")),
                similar::ChangeTag::Insert => Some(format!("\x1b[32m+ {line}\x1b[0m")),
                similar::ChangeTag::Equal => None,
            }
        })
        .collect()
}

/// Whether `path` is a regular file (not a symlink) whose bytes equal `text`.
fn content_matches(text: &str, path: &Path) -> Result<bool> {
    let is_regular_file = path.symlink_metadata().is_ok_and(|m| m.is_file());
    if !is_regular_file {
        return Ok(false);
    }
    let current = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(current == text.as_bytes())
}
