//! Discovery of external executables on `PATH`.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use crate::error::ToolError;

/// An external executable looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tool {
    name: &'static str,
}

/// `curl`
pub const CURL: Tool = Tool::new("curl");
/// `git`
pub const GIT: Tool = Tool::new("git");
/// `sh`
pub const SH: Tool = Tool::new("sh");
/// `zsh`
pub const ZSH: Tool = Tool::new("zsh");
/// `ssh-keygen`
pub const SSH_KEYGEN: Tool = Tool::new("ssh-keygen");
/// `chsh`
pub const CHSH: Tool = Tool::new("chsh");

/// Tools without which the installer cannot do anything useful.
pub const REQUIRED_TOOLS: [Tool; 4] = [CURL, GIT, SH, ZSH];

/// Lookup results, cached for the lifetime of the process.
fn cache() -> &'static Mutex<HashMap<&'static str, Option<PathBuf>>> {
    static CACHE: OnceLock<Mutex<HashMap<&'static str, Option<PathBuf>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

impl Tool {
    /// A tool looked up as `name` on `PATH`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Executable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }

    /// Absolute path of the executable.
    ///
    /// The first lookup of each name is cached, including misses.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] if the executable is not on `PATH`.
    pub fn path(self) -> Result<PathBuf, ToolError> {
        let found = cache().lock().map_or_else(
            |_| which::which(self.name).ok(),
            |mut cache| {
                cache
                    .entry(self.name)
                    .or_insert_with(|| which::which(self.name).ok())
                    .clone()
            },
        );
        found.ok_or_else(|| ToolError::NotFound {
            name: self.name.to_string(),
        })
    }

    /// Whether the executable is on `PATH`.
    #[must_use]
    pub fn available(self) -> bool {
        self.path().is_ok()
    }
}

/// Required tools that are not on `PATH`, in declaration order.
#[must_use]
pub fn missing_required_tools() -> Vec<Tool> {
    REQUIRED_TOOLS
        .into_iter()
        .filter(|tool| !tool.available())
        .collect()
}

/// Check that every required tool is available.
///
/// # Errors
///
/// Returns [`ToolError::MissingRequired`] naming every missing tool.
pub fn check_required_tools() -> Result<(), ToolError> {
    let missing = missing_required_tools();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ToolError::MissingRequired {
        names: missing
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", "),
    })
}
