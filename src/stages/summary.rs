//! End-of-run summary and the stage catalogue shown by `--list`.
use std::path::Path;

use super::{Stage, StageRegistry, StageStatus};
use crate::logging::Log;

/// Icon and ANSI color for a status.
const fn decoration(status: StageStatus) -> (&'static str, &'static str) {
    match status {
        StageStatus::Success => ("✓", "\x1b[32m"),
        StageStatus::Skipped => ("○", "\x1b[33m"),
        StageStatus::Failure => ("✗", "\x1b[31m"),
        StageStatus::NotExecuted => ("·", "\x1b[2m"),
    }
}

/// Per-status totals of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Stages that ran to completion.
    pub success: usize,
    /// Stages that were filtered out, not needed or declined.
    pub skipped: usize,
    /// Stages whose body failed.
    pub failure: usize,
    /// Stages the run never reached.
    pub not_executed: usize,
}

impl Counts {
    /// Tally the current statuses of `registry`.
    #[must_use]
    pub fn of(registry: &StageRegistry) -> Self {
        registry.iter().fold(Self::default(), |mut counts, stage| {
            match stage.status() {
                StageStatus::Success => counts.success += 1,
                StageStatus::Skipped => counts.skipped += 1,
                StageStatus::Failure => counts.failure += 1,
                StageStatus::NotExecuted => counts.not_executed += 1,
            }
            counts
        })
    }

    /// Number of stages counted.
    #[must_use]
    pub const fn total(self) -> usize {
        self.success + self.skipped + self.failure + self.not_executed
    }
}

/// Log one line per stage with its final status, then the totals.
pub fn print_summary(registry: &StageRegistry, log: &dyn Log, log_file: Option<&Path>) {
    if registry.is_empty() {
        return;
    }

    log.info("");
    log.stage("Summary");

    for stage in registry {
        let (icon, color) = decoration(stage.status());
        let suffix = match stage.status() {
            StageStatus::Success => String::new(),
            other => format!(" ({other})"),
        };
        log.info(&format!("{color}{icon} {}{suffix}\x1b[0m", stage.name()));
    }

    let counts = Counts::of(registry);
    log.info("");
    log.info(&format!(
        "{} stages: \x1b[32m{} ok\x1b[0m, \x1b[33m{} skipped\x1b[0m, \x1b[31m{} failed\x1b[0m, \x1b[2m{} not executed\x1b[0m",
        counts.total(),
        counts.success,
        counts.skipped,
        counts.failure,
        counts.not_executed,
    ));

    if let Some(path) = log_file {
        log.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
    }
}

/// Render the catalogue of registered stages, one per line:
/// flag name, markers, the help text and the resolved dependencies.
///
/// Markers: `?` asks before running, `!` aborts the run on failure.
/// Dependencies are only shown once
/// [`StageRegistry::resolve_dependencies`] has run.
#[must_use]
pub fn render_list(registry: &StageRegistry) -> Vec<String> {
    let width = registry
        .flag_names()
        .map(str::len)
        .max()
        .unwrap_or_default();
    registry
        .iter()
        .map(|stage| {
            let confirm = if stage.interactive_confirm() { '?' } else { ' ' };
            let abort = if stage.abort_on_error() { '!' } else { ' ' };
            format!(
                "{:<width$} {confirm}{abort} {}{}",
                stage.flag_name(),
                stage.details(),
                after(registry, stage)
            )
        })
        .collect()
}

/// ` (after: a, b)` naming the stages `stage` depends on, or nothing.
fn after(registry: &StageRegistry, stage: &Stage) -> String {
    let names: Vec<&str> = registry
        .id_of(stage.flag_name())
        .into_iter()
        .flat_map(|id| registry.dependencies_of(id))
        .map(Stage::flag_name)
        .collect();
    if names.is_empty() {
        String::new()
    } else {
        format!(" (after: {})", names.join(", "))
    }
}
