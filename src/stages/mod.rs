//! Named, independently skippable units of installer work.
//!
//! A [`Stage`] wraps a function together with its execution policy. Stages
//! are collected in a [`StageRegistry`] and executed strictly in
//! registration order by [`StageRegistry::run`].
pub mod builtin;
pub mod registry;
pub mod summary;

pub use registry::{StageId, StageRegistry};

use std::fmt;

use crate::config::RunConfig;
use crate::error::StageError;
use crate::logging::Log;
use crate::platform::Platform;
use crate::prompt::Prompt;

/// Body of a stage.
pub type StageFn = Box<dyn Fn(&RunConfig) -> anyhow::Result<()>>;

/// Runtime check deciding whether a stage is needed at all.
pub type Predicate = Box<dyn Fn() -> bool>;

/// Outcome of a stage in the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageStatus {
    /// The stage has not run yet, or the run stopped before reaching it.
    #[default]
    NotExecuted,
    /// The stage body returned normally.
    Success,
    /// The stage body returned an error.
    Failure,
    /// A filter, predicate or the user decided not to run the stage.
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotExecuted => write!(f, "not executed"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// A declared dependency, resolved later by
/// [`StageRegistry::resolve_dependencies`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// A flag name or function name.
    Name(String),
    /// A stage already registered in the same registry.
    Stage(StageId),
}

impl From<&str> for Dependency {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for Dependency {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<StageId> for Dependency {
    fn from(id: StageId) -> Self {
        Self::Stage(id)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Stage(id) => write!(f, "#{}", id.index()),
        }
    }
}

/// Derive the command-line flag name of a stage from its display name.
///
/// Lowercases, turns spaces into dashes and drops dots:
/// `"Install VS Code ext."` becomes `"install-vs-code-ext"`.
#[must_use]
pub fn flag_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "-").replace('.', "")
}

/// A named unit of work with its execution policy and run status.
pub struct Stage {
    name: String,
    flag_name: String,
    details: Option<String>,
    function_name: Option<String>,
    func: StageFn,
    interactive_confirm: bool,
    predicate: Option<Predicate>,
    abort_on_error: bool,
    platforms: Vec<Platform>,
    pub(crate) declared_dependencies: Vec<Dependency>,
    pub(crate) resolved_dependencies: Vec<StageId>,
    status: StageStatus,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("flag_name", &self.flag_name)
            .field("interactive_confirm", &self.interactive_confirm)
            .field("has_predicate", &self.predicate.is_some())
            .field("abort_on_error", &self.abort_on_error)
            .field("platforms", &self.platforms)
            .field("declared_dependencies", &self.declared_dependencies)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Stage {
    /// Start building a stage named `name` that runs `func`.
    ///
    /// When `func` is a plain function its name becomes the stage's
    /// function name, usable as a [`Dependency::Name`]. Closures have none
    /// unless [`StageBuilder::function_name`] sets one.
    pub fn builder<F>(name: impl Into<String>, func: F) -> StageBuilder
    where
        F: Fn(&RunConfig) -> anyhow::Result<()> + 'static,
    {
        let name = name.into();
        StageBuilder {
            flag_name: flag_name(&name),
            name,
            details: None,
            function_name: function_name_of::<F>(),
            func: Box::new(func),
            interactive_confirm: false,
            predicate: None,
            abort_on_error: false,
            platforms: Platform::ALL.to_vec(),
            dependencies: Vec::new(),
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name used by `--skip` and `--only`.
    #[must_use]
    pub fn flag_name(&self) -> &str {
        &self.flag_name
    }

    /// Help text, defaulting to the stage name.
    #[must_use]
    pub fn details(&self) -> &str {
        self.details.as_deref().unwrap_or(&self.name)
    }

    /// Name of the wrapped function, if it has one.
    #[must_use]
    pub fn function_name(&self) -> Option<&str> {
        self.function_name.as_deref()
    }

    /// Whether the user is asked before the stage runs.
    #[must_use]
    pub const fn interactive_confirm(&self) -> bool {
        self.interactive_confirm
    }

    /// Whether a failure stops the run.
    #[must_use]
    pub const fn abort_on_error(&self) -> bool {
        self.abort_on_error
    }

    /// Platforms the stage applies to; empty means all.
    #[must_use]
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    /// Dependencies as declared, before resolution.
    #[must_use]
    pub fn declared_dependencies(&self) -> &[Dependency] {
        &self.declared_dependencies
    }

    /// Dependencies after the last [`StageRegistry::resolve_dependencies`].
    #[must_use]
    pub fn resolved_dependencies(&self) -> &[StageId] {
        &self.resolved_dependencies
    }

    /// Status in the current run.
    #[must_use]
    pub const fn status(&self) -> StageStatus {
        self.status
    }

    /// Whether the stage applies to `platform`. An empty platform set means
    /// no restriction.
    #[must_use]
    pub fn is_valid_for(&self, platform: Platform) -> bool {
        self.platforms.is_empty() || self.platforms.contains(&platform)
    }

    pub(crate) const fn reset(&mut self) {
        self.status = StageStatus::NotExecuted;
    }

    /// Run the stage under `cfg`.
    ///
    /// Skip conditions are checked in order: the skip list, the only list,
    /// the predicate and finally the interactive confirmation. The first one
    /// that applies marks the stage [`StageStatus::Skipped`] without calling
    /// the body. Output logged by the body is indented one level.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::Aborted`] if the body (or the confirmation
    /// prompt) fails and the stage is marked abort-on-error. Other failures
    /// are logged and reported as `Ok(StageStatus::Failure)`.
    pub fn execute(
        &mut self,
        cfg: &RunConfig,
        prompt: &dyn Prompt,
        log: &dyn Log,
    ) -> Result<StageStatus, StageError> {
        self.reset();

        if cfg.skipped_stages().contains(&self.flag_name) {
            log.debug(&format!("{} is in the skip list", self.name));
            return Ok(self.finish(StageStatus::Skipped));
        }
        if !cfg.only_stages().is_empty() && !cfg.only_stages().contains(&self.flag_name) {
            log.debug(&format!("{} is not in the only list", self.name));
            return Ok(self.finish(StageStatus::Skipped));
        }
        if let Some(predicate) = &self.predicate
            && !predicate()
        {
            log.info(&format!("{} is not required, skip", self.name));
            return Ok(self.finish(StageStatus::Skipped));
        }
        if self.interactive_confirm && !cfg.confirm_all_stages() {
            match prompt.confirm(&format!("{}?", self.name), Some(true)) {
                Ok(true) => {}
                Ok(false) => {
                    log.debug(&format!("{} declined", self.name));
                    return Ok(self.finish(StageStatus::Skipped));
                }
                Err(e) => return self.fail(&anyhow::Error::new(e), log),
            }
        }

        log.stage(&format!("{} ...", self.name));
        let result = {
            let _indent = log.indent();
            (self.func)(cfg)
        };

        match result {
            Ok(()) => {
                log.info(&format!("{} - done", self.name));
                Ok(self.finish(StageStatus::Success))
            }
            Err(e) => self.fail(&e, log),
        }
    }

    const fn finish(&mut self, status: StageStatus) -> StageStatus {
        self.status = status;
        status
    }

    fn fail(&mut self, err: &anyhow::Error, log: &dyn Log) -> Result<StageStatus, StageError> {
        self.status = StageStatus::Failure;
        log.error(&format!("{}: {err:#}", self.name));
        if self.abort_on_error {
            return Err(StageError::Aborted {
                stage: self.name.clone(),
                reason: format!("{err:#}"),
            });
        }
        Ok(StageStatus::Failure)
    }
}

/// Last path segment of `F`'s type name.
///
/// `None` for anything that is not a plain fn item: closures
/// (`{{closure}}`), fn pointers (`fn(&T) -> R`) and generic wrappers such as
/// `Box<dyn Fn..>`.
fn function_name_of<F>() -> Option<String> {
    let full = std::any::type_name::<F>();
    if full.contains(['{', '(', '<']) {
        return None;
    }
    full.rsplit("::").next().map(String::from)
}

/// Builder for [`Stage`].
pub struct StageBuilder {
    name: String,
    flag_name: String,
    details: Option<String>,
    function_name: Option<String>,
    func: StageFn,
    interactive_confirm: bool,
    predicate: Option<Predicate>,
    abort_on_error: bool,
    platforms: Vec<Platform>,
    dependencies: Vec<Dependency>,
}

impl fmt::Debug for StageBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageBuilder")
            .field("name", &self.name)
            .field("flag_name", &self.flag_name)
            .finish_non_exhaustive()
    }
}

impl StageBuilder {
    /// Ask the user before running, unless the run confirms all stages.
    #[must_use]
    pub const fn interactive_confirm(mut self, enabled: bool) -> Self {
        self.interactive_confirm = enabled;
        self
    }

    /// Run only when `predicate` returns `true` at execution time.
    #[must_use]
    pub fn predicate(mut self, predicate: impl Fn() -> bool + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Stop the whole run if this stage fails.
    #[must_use]
    pub const fn abort_on_error(mut self, enabled: bool) -> Self {
        self.abort_on_error = enabled;
        self
    }

    /// Help text shown by `--list`.
    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Restrict the stage to `platforms`.
    #[must_use]
    pub fn platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platforms = platforms.into_iter().collect();
        self
    }

    /// Declare a dependency. May be called repeatedly.
    #[must_use]
    pub fn depends_on(mut self, dependency: impl Into<Dependency>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Override the name used when other stages depend on this one by
    /// function name.
    #[must_use]
    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Finish the stage.
    #[must_use]
    pub fn build(self) -> Stage {
        Stage {
            name: self.name,
            flag_name: self.flag_name,
            details: self.details,
            function_name: self.function_name,
            func: self.func,
            interactive_confirm: self.interactive_confirm,
            predicate: self.predicate,
            abort_on_error: self.abort_on_error,
            platforms: self.platforms,
            declared_dependencies: self.dependencies,
            resolved_dependencies: Vec::new(),
            status: StageStatus::NotExecuted,
        }
    }
}
