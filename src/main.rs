//! `dotfiles-installer` binary entry point.
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use dotfiles_installer::cli::Cli;
use dotfiles_installer::commands;
use dotfiles_installer::logging::{Logger, init_subscriber};

fn main() -> ExitCode {
    #[cfg(windows)]
    let _ = enable_ansi_support::enable_ansi_support();
    let cli = Cli::parse();
    init_subscriber(cli.verbose, cli.command_name());
    let log = Arc::new(Logger::new(cli.command_name()));

    let result = if cli.list {
        commands::list::run(&cli, &log)
    } else {
        commands::install::run(&cli, &log)
    };

    result.unwrap_or_else(|e| {
        log.error(&format!("{e:#}"));
        ExitCode::FAILURE
    })
}
