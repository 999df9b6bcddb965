//! Command-line interface definition.
use std::path::PathBuf;

use clap::Parser;

/// Version string baked in by `build.rs`, falling back to the crate version.
pub const VERSION: &str = match option_env!("DOTFILES_INSTALLER_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Command-line interface of the installer.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dotfiles-installer",
    about = "Set up a personal machine in ordered, skippable stages",
    version = VERSION
)]
pub struct Cli {
    /// Skip the given stages (comma-separated flag names)
    #[arg(long, value_delimiter = ',', conflicts_with = "only")]
    pub skip: Vec<String>,

    /// Run only the given stages (comma-separated flag names)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Run interactive stages without asking
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Email address for git and the SSH key comment
    #[arg(long)]
    pub email: Option<String>,

    /// Repository root holding the `home/` directory (default: current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Settings file (default: $XDG_CONFIG_HOME/dotfiles-installer/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List the available stages and exit
    #[arg(long)]
    pub list: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Command name used for the log file.
    #[must_use]
    pub const fn command_name(&self) -> &'static str {
        if self.list { "list" } else { "install" }
    }
}
