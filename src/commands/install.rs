//! The default command: run every selected stage and print a summary.
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{Cli, VERSION};
use crate::config::{Identity, RunConfig, Settings};
use crate::error::PromptError;
use crate::logging::{Log, Logger};
use crate::prompt::LinePrompt;
use crate::stages::StageRegistry;
use crate::stages::builtin::CONFIGURE_GIT;
use crate::stages::summary::print_summary;

/// Run the installer.
///
/// Returns [`ExitCode::FAILURE`] when an abort-on-error stage fails; other
/// stage failures are reported in the summary only.
///
/// # Errors
///
/// Returns an error for configuration problems detected before any stage
/// runs: unreadable settings, conflicting or unknown stage filters, or an
/// unresolvable user.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<ExitCode> {
    let dyn_log: Arc<dyn Log> = Arc::clone(log) as Arc<dyn Log>;
    log.info(&format!("dotfiles-installer {VERSION}"));

    let settings = super::load_settings(cli)?;
    let config = run_config(cli, settings, Identity::from_env()?)?;
    log.debug(&format!(
        "platform {}, user {}",
        config.platform(),
        config.identity().username
    ));

    let environment = super::environment(cli, config.timestamp(), &dyn_log)?;
    log.debug(&format!(
        "root {}, home {}",
        environment.root.display(),
        environment.home.display()
    ));
    let mut registry = super::build_registry(config.platform(), &environment, &dyn_log);
    registry.validate_flags(config.skipped_stages().iter().chain(config.only_stages()))?;

    let outcome = {
        let prompt = LinePrompt::stdio();
        let config = ensure_email(config, &registry, &prompt)?;
        registry.run(&config, &prompt)
    };
    print_summary(
        &registry,
        log.as_ref(),
        log.log_path().map(PathBuf::as_path),
    );

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            log.error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Combine the settings file with the command line into a [`RunConfig`].
///
/// # Errors
///
/// Returns [`ConfigError::ConflictingFilters`](crate::error::ConfigError)
/// if both filters end up set.
pub fn run_config(cli: &Cli, settings: Settings, identity: Identity) -> Result<RunConfig> {
    let settings = settings.merge_cli(&cli.skip, &cli.only, cli.yes, cli.email.as_deref());
    let config = RunConfig::builder(identity)
        .confirm_all_stages(settings.stages.confirm_all)
        .skipped_stages(settings.stages.skip)
        .only_stages(settings.stages.only)
        .email(settings.user.email)
        .build()?;
    Ok(config)
}

/// Loose email shape check: something before `@`, a dot after it.
fn looks_like_email(s: &str) -> bool {
    s.split_once('@').is_some_and(|(user, domain)| {
        !user.is_empty() && !domain.starts_with('.') && domain.contains('.')
    })
}

/// Ask for an email address when git will be configured without one.
///
/// Nothing is asked when every stage is confirmed up front; the stage then
/// fails with a hint to pass `--email`.
///
/// # Errors
///
/// Returns an error if the answer cannot be read.
pub fn ensure_email<R: BufRead, W: Write>(
    config: RunConfig,
    registry: &StageRegistry,
    prompt: &LinePrompt<R, W>,
) -> Result<RunConfig, PromptError> {
    let needs_email = config.email().is_none()
        && !config.confirm_all_stages()
        && registry.get_by_flag(CONFIGURE_GIT).is_some()
        && config.selects(CONFIGURE_GIT);
    if !needs_email {
        return Ok(config);
    }
    let email = prompt.ask("Email address for git", None, true, Some(looks_like_email))?;
    Ok(config.with_email(email))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use clap::Parser as _;

    use super::*;
    use crate::logging::RecordingLog;
    use crate::platform::Platform;
    use crate::stages::Stage;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("dotfiles-installer").chain(args.iter().copied()))
    }

    fn identity() -> Identity {
        Identity::new("jdoe", "Jane Doe")
    }

    fn registry_with_git() -> StageRegistry {
        let mut registry = StageRegistry::new(Platform::Linux, Arc::new(RecordingLog::default()));
        registry.register(Stage::builder("Configure git", |_: &RunConfig| Ok(())).build());
        registry
    }

    fn prompt(input: &str) -> LinePrompt<Cursor<Vec<u8>>, Vec<u8>> {
        LinePrompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("jane@example.com"));
        assert!(!looks_like_email("jane"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("jane@localhost"));
        assert!(!looks_like_email("jane@.com"));
    }

    #[test]
    fn cli_overrides_settings_filters() {
        let settings =
            Settings::parse("[stages]\nskip = [\"link-dotfiles\"]\n", "c.toml".as_ref()).unwrap();
        let config = run_config(&cli(&["--only", "configure-git"]), settings, identity()).unwrap();
        assert!(config.skipped_stages().is_empty());
        assert!(config.selects("configure-git"));
        assert!(!config.selects("link-dotfiles"));
    }

    #[test]
    fn settings_filters_apply_without_cli() {
        let settings = Settings::parse(
            "[stages]\nskip = [\"link-dotfiles\"]\nconfirm_all = true\n[user]\nemail = \"a@b.io\"\n",
            "c.toml".as_ref(),
        )
        .unwrap();
        let config = run_config(&cli(&[]), settings, identity()).unwrap();
        assert!(!config.selects("link-dotfiles"));
        assert!(config.confirm_all_stages());
        assert_eq!(config.email(), Some("a@b.io"));
    }

    #[test]
    fn conflicting_settings_filters_are_rejected() {
        let settings = Settings::parse(
            "[stages]\nskip = [\"a\"]\nonly = [\"b\"]\n",
            "c.toml".as_ref(),
        )
        .unwrap();
        let err = run_config(&cli(&[]), settings, identity()).unwrap_err();
        assert!(err.to_string().contains("skip and only"));
    }

    #[test]
    fn asks_for_missing_email() {
        let config = run_config(&cli(&[]), Settings::default(), identity()).unwrap();
        let prompt = prompt("nope\njane@example.com\ny\n");
        let config = ensure_email(config, &registry_with_git(), &prompt).unwrap();
        assert_eq!(config.email(), Some("jane@example.com"));
        let output = String::from_utf8(prompt.into_output()).unwrap();
        assert!(output.contains("Invalid input: nope"));
    }

    #[test]
    fn no_question_when_email_given() {
        let config =
            run_config(&cli(&["--email", "j@x.org"]), Settings::default(), identity()).unwrap();
        let prompt = prompt("");
        let config = ensure_email(config, &registry_with_git(), &prompt).unwrap();
        assert_eq!(config.email(), Some("j@x.org"));
        assert!(prompt.into_output().is_empty());
    }

    #[test]
    fn no_question_when_git_not_selected_or_confirm_all() {
        let registry = registry_with_git();
        for args in [&["--skip", "configure-git"][..], &["--yes"][..]] {
            let config = run_config(&cli(args), Settings::default(), identity()).unwrap();
            let prompt = prompt("");
            let config = ensure_email(config, &registry, &prompt).unwrap();
            assert_eq!(config.email(), None);
        }
    }
}
