//! `--list`: print the stages available on this platform.
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::Cli;
use crate::logging::{Log, Logger};
use crate::platform::Platform;
use crate::stages::summary::render_list;

/// Print one line per registered stage.
///
/// # Errors
///
/// Returns an error if the run environment cannot be resolved.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<ExitCode> {
    let dyn_log: Arc<dyn Log> = Arc::clone(log) as Arc<dyn Log>;
    let platform = Platform::current();
    let environment = super::environment(cli, &chrono::Local::now(), &dyn_log)?;
    let registry = super::build_registry(platform, &environment, &dyn_log);

    log.stage(&format!("Stages for {platform}"));
    for line in render_list(&registry) {
        log.info(&line);
    }
    log.info("");
    log.info("? asks before running, ! aborts the run on failure");
    Ok(ExitCode::SUCCESS)
}
