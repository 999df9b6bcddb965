//! File-system helpers shared by the dotfile manager and stage bodies.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent: {}", parent.display()))?;
    }
    Ok(())
}

/// Create a symlink at `link` pointing to `target`.
///
/// # Errors
///
/// Returns an error if the link cannot be created, e.g. because `link`
/// already exists.
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link)
        .with_context(|| format!("creating symlink {} -> {}", link.display(), target.display()))?;

    #[cfg(windows)]
    {
        let result = if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        };
        result.with_context(|| {
            format!("creating symlink {} -> {}", link.display(), target.display())
        })?;
    }

    Ok(())
}

/// List every file below `root`, relative to `root`, sorted.
///
/// Real directories are recursed into and `.git` directories are skipped.
/// Symlinks are never followed: a link to a directory is listed as a single
/// entry, so link cycles cannot recurse.
///
/// # Errors
///
/// Returns an error if a directory or one of its entries cannot be read.
pub fn files_under(root: &Path) -> Result<Vec<PathBuf>> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in
            std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?
        {
            let entry = entry.with_context(|| format!("reading entry in {}", dir.display()))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .with_context(|| format!("reading file type of {}", path.display()))?;
            if file_type.is_dir() {
                if entry.file_name() == ".git" {
                    continue;
                }
                walk(root, &path, out)?;
            } else if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_path_buf());
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    walk(root, root, &mut files)?;
    files.sort();
    Ok(files)
}
