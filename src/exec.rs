//! Thin wrappers around [`std::process::Command`] for stage bodies.
use anyhow::{Context, Result, bail};
use std::ffi::OsStr;
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

fn label(program: &OsStr) -> String {
    program.to_string_lossy().into_owned()
}

/// Run a command and return its captured output. Fails if the command exits
/// non-zero.
///
/// # Errors
///
/// Returns an error if the command cannot be started or exits non-zero.
pub fn run(program: impl AsRef<OsStr>, args: &[&str]) -> Result<ExecResult> {
    let program = program.as_ref();
    let label = label(program);
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    let result = ExecResult::from(output);
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

/// Run a command, allowing failure (returns result without bailing).
///
/// # Errors
///
/// Returns an error only if the command cannot be started.
pub fn run_unchecked(program: impl AsRef<OsStr>, args: &[&str]) -> Result<ExecResult> {
    let program = program.as_ref();
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to execute: {}", label(program)))?;

    Ok(ExecResult::from(output))
}

/// Run a command attached to the terminal, so it can prompt the user
/// (passwords, passphrases). Fails if the command exits non-zero.
///
/// # Errors
///
/// Returns an error if the command cannot be started or exits non-zero.
pub fn run_interactive(program: impl AsRef<OsStr>, args: &[&str]) -> Result<()> {
    let program = program.as_ref();
    let label = label(program);
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to execute: {label}"))?;
    if !status.success() {
        bail!("{label} failed (exit {})", status.code().unwrap_or(-1));
    }
    Ok(())
}
