//! Target platform detection.
use std::fmt;

/// Operating system family a stage can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Any Linux distribution.
    Linux,
    /// macOS.
    Darwin,
    /// Windows.
    Windows,
    /// Everything else.
    Other,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "Linux"),
            Self::Darwin => write!(f, "Darwin"),
            Self::Windows => write!(f, "Windows"),
            Self::Other => write!(f, "Other"),
        }
    }
}

impl Platform {
    /// Every platform a stage can be restricted to.
    pub const ALL: [Self; 4] = [Self::Linux, Self::Darwin, Self::Windows, Self::Other];

    /// Detect the platform this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::Darwin
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Other
        }
    }
}
