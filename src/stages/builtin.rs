//! The stages shipped with the installer, in the order they run.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::{Stage, StageRegistry};
use crate::config::RunConfig;
use crate::dotfiles::{DotfileManager, Materialized};
use crate::exec;
use crate::fs::{ensure_parent_dir, files_under};
use crate::logging::Log;
use crate::platform::Platform;
use crate::tools::{self, CHSH, GIT, SSH_KEYGEN, ZSH};

/// Flag name of the tool check.
pub const CHECK_REQUIRED_TOOLS: &str = "check-required-tools";
/// Flag name of the git identity stage.
pub const CONFIGURE_GIT: &str = "configure-git";
/// Flag name of the dotfile linking stage.
pub const LINK_DOTFILES: &str = "link-dotfiles";
/// Flag name of the SSH key stage.
pub const GENERATE_SSH_KEY: &str = "generate-ssh-key";
/// Flag name of the login shell stage.
pub const SET_LOGIN_SHELL: &str = "set-login-shell";

/// Where the built-in stages read from and write to.
pub struct Environment {
    /// Repository root; dotfiles live under `<root>/home`.
    pub root: PathBuf,
    /// The user's home directory.
    pub home: PathBuf,
    /// Backup-aware writer shared by every stage of the run.
    pub dotfiles: Arc<DotfileManager>,
    /// Sink for stage body output.
    pub log: Arc<dyn Log>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("root", &self.root)
            .field("home", &self.home)
            .finish_non_exhaustive()
    }
}

impl Environment {
    /// Directory whose files are linked into the home directory.
    #[must_use]
    pub fn dotfiles_dir(&self) -> PathBuf {
        self.root.join("home")
    }

    /// File holding the git identity, included from the global git config.
    #[must_use]
    pub fn gitconfig_user(&self) -> PathBuf {
        self.home.join(".gitconfig.user")
    }

    /// Private key created by the SSH key stage.
    #[must_use]
    pub fn ssh_key(&self) -> PathBuf {
        self.home.join(".ssh").join("id_ed25519")
    }
}

/// Register every built-in stage on `registry`.
pub fn register_all(registry: &mut StageRegistry, env: &Arc<Environment>) {
    registry.register(
        Stage::builder("Check required tools", check_required_tools)
            .abort_on_error(true)
            .details("Abort unless curl, git, sh and zsh are on PATH")
            .build(),
    );

    let body_env = Arc::clone(env);
    registry.register(
        Stage::builder("Configure git", move |cfg: &RunConfig| {
            configure_git(&body_env, cfg)
        })
        .function_name("configure_git")
        .predicate(|| GIT.available())
        .depends_on(CHECK_REQUIRED_TOOLS)
        .details("Write the git user name and email to ~/.gitconfig.user")
        .build(),
    );

    let body_env = Arc::clone(env);
    let dotfiles_dir = env.dotfiles_dir();
    registry.register(
        Stage::builder("Link dotfiles", move |_: &RunConfig| {
            link_dotfiles(&body_env)
        })
        .function_name("link_dotfiles")
        .interactive_confirm(true)
        .predicate(move || dotfiles_dir.is_dir())
        .depends_on("check_required_tools")
        .details("Symlink every file under <root>/home into $HOME")
        .build(),
    );

    let body_env = Arc::clone(env);
    let key = env.ssh_key();
    registry.register(
        Stage::builder("Generate SSH key", move |cfg: &RunConfig| {
            generate_ssh_key(&body_env, cfg)
        })
        .function_name("generate_ssh_key")
        .interactive_confirm(true)
        .predicate(move || SSH_KEYGEN.available() && key.symlink_metadata().is_err())
        .details("Create ~/.ssh/id_ed25519 with ssh-keygen")
        .build(),
    );

    let body_env = Arc::clone(env);
    registry.register(
        Stage::builder("Set login shell", move |_: &RunConfig| {
            set_login_shell(&body_env)
        })
        .function_name("set_login_shell")
        .platforms([Platform::Linux, Platform::Darwin])
        .interactive_confirm(true)
        .predicate(|| {
            ZSH.available() && !login_shell_is_zsh(std::env::var("SHELL").ok().as_deref())
        })
        .depends_on(CHECK_REQUIRED_TOOLS)
        .details("Make zsh the login shell with chsh")
        .build(),
    );
}

fn check_required_tools(_: &RunConfig) -> Result<()> {
    tools::check_required_tools()?;
    Ok(())
}

/// Contents of `~/.gitconfig.user`.
#[must_use]
pub fn gitconfig_user_text(full_name: &str, email: &str) -> String {
    format!("[user]\n\tname = {full_name}\n\temail = {email}\n")
}

fn configure_git(env: &Environment, cfg: &RunConfig) -> Result<()> {
    let email = cfg
        .email()
        .context("no email address configured; pass --email or set [user] email")?;
    let path = env.gitconfig_user();
    let text = gitconfig_user_text(&cfg.identity().full_name, email);
    env.dotfiles.safe_write(&text, &path)?;

    let git = GIT.path()?;
    let include = path.to_string_lossy();
    let current = exec::run_unchecked(&git, &["config", "--global", "--get-all", "include.path"])?;
    if current.stdout.lines().any(|line| line.trim() == include) {
        env.log.debug(&format!(
            "{include} is already included from the global git config"
        ));
        return Ok(());
    }
    exec::run(&git, &["config", "--global", "--add", "include.path", &include])?;
    env.log.info(&format!("Include {include} from the global git config"));
    Ok(())
}

/// Whether `link` already is a symlink pointing at `source`.
fn already_linked(source: &Path, link: &Path) -> bool {
    std::fs::read_link(link).is_ok_and(|target| target == source)
}

fn link_dotfiles(env: &Environment) -> Result<()> {
    let source_root = env.dotfiles_dir();
    let mut linked = 0usize;
    let mut backed_up = 0usize;

    for relative in files_under(&source_root)? {
        let source = source_root.join(&relative);
        let destination = env.home.join(&relative);
        if already_linked(&source, &destination) {
            env.log.debug(&format!("{} is already linked", destination.display()));
            continue;
        }
        ensure_parent_dir(&destination)?;
        if let Materialized::Written { backup, .. } =
            env.dotfiles.safe_symlink(&source, &destination)?
        {
            linked += 1;
            backed_up += usize::from(backup.is_some());
        }
    }

    env.log.info(&format!(
        "{linked} links created, {backed_up} files backed up"
    ));
    Ok(())
}

fn generate_ssh_key(env: &Environment, cfg: &RunConfig) -> Result<()> {
    let key = env.ssh_key();
    ensure_parent_dir(&key)?;
    let comment = cfg.email().unwrap_or(&cfg.identity().username);
    let key_arg = key.to_string_lossy();
    exec::run_interactive(
        SSH_KEYGEN.path()?,
        &["-t", "ed25519", "-C", comment, "-f", &key_arg],
    )?;
    env.log.info(&format!("Created {key_arg}"));
    Ok(())
}

/// Whether the `$SHELL` value names zsh.
fn login_shell_is_zsh(shell: Option<&str>) -> bool {
    shell
        .and_then(|s| Path::new(s).file_name())
        .is_some_and(|name| name == "zsh")
}

fn set_login_shell(env: &Environment) -> Result<()> {
    let zsh = ZSH.path()?;
    let zsh_arg = zsh.to_string_lossy();
    exec::run_interactive(CHSH.path()?, &["-s", &zsh_arg])?;
    env.log.info(&format!("Login shell set to {zsh_arg}"));
    Ok(())
}
