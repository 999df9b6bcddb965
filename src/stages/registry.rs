//! Ordered collection of the stages applicable to this machine.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{Dependency, Stage};
use crate::config::RunConfig;
use crate::error::{ConfigError, StageError};
use crate::logging::Log;
use crate::platform::Platform;
use crate::prompt::Prompt;

/// Handle to a stage registered in a [`StageRegistry`].
///
/// Only meaningful for the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(usize);

impl StageId {
    /// Position of the stage in registration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Stages keyed by flag name, kept in registration order.
///
/// Stages not valid for the registry's platform are dropped at
/// registration and never seen by validation, listing or execution.
pub struct StageRegistry {
    platform: Platform,
    stages: Vec<Stage>,
    by_flag: HashMap<String, StageId>,
    log: Arc<dyn Log>,
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRegistry")
            .field("platform", &self.platform)
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

impl StageRegistry {
    /// Empty registry accepting stages for `platform`.
    #[must_use]
    pub fn new(platform: Platform, log: Arc<dyn Log>) -> Self {
        Self {
            platform,
            stages: Vec::new(),
            by_flag: HashMap::new(),
            log,
        }
    }

    /// Platform stages are registered for.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Add `stage` if it applies to this platform.
    ///
    /// A stage whose flag name is already registered replaces the earlier
    /// one and keeps its position. Returns `None` when the stage was dropped.
    pub fn register(&mut self, stage: Stage) -> Option<StageId> {
        if !stage.is_valid_for(self.platform) {
            self.log.debug(&format!(
                "'{}' does not apply to {}, not registered",
                stage.name(),
                self.platform
            ));
            return None;
        }
        self.log.debug(&format!("Register '{}' stage", stage.name()));

        if let Some(&id) = self.by_flag.get(stage.flag_name()) {
            if let Some(slot) = self.stages.get_mut(id.0) {
                *slot = stage;
            }
            return Some(id);
        }

        let id = StageId(self.stages.len());
        self.by_flag.insert(stage.flag_name().to_string(), id);
        self.stages.push(stage);
        Some(id)
    }

    /// Stages in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Stage> {
        self.stages.iter()
    }

    /// Stage with the given id.
    #[must_use]
    pub fn get(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(id.0)
    }

    /// Stage registered under `flag_name`.
    #[must_use]
    pub fn get_by_flag(&self, flag_name: &str) -> Option<&Stage> {
        self.id_of(flag_name).and_then(|id| self.get(id))
    }

    /// Id of the stage registered under `flag_name`.
    #[must_use]
    pub fn id_of(&self, flag_name: &str) -> Option<StageId> {
        self.by_flag.get(flag_name).copied()
    }

    /// Number of registered stages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether no stage is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Flag names in registration order.
    pub fn flag_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(Stage::flag_name)
    }

    /// Recompute every stage's resolved dependencies.
    ///
    /// A name is looked up among flag names first, then among function
    /// names. References that cannot be resolved are reported as warnings
    /// and dropped. Resolution is bookkeeping only; it never changes the
    /// execution order.
    pub fn resolve_dependencies(&mut self) {
        let by_function: HashMap<&str, StageId> = self
            .stages
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.function_name().map(|f| (f, StageId(i))))
            .collect();

        let mut resolved = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let mut ids = Vec::new();
            for dependency in stage.declared_dependencies() {
                let found = match dependency {
                    Dependency::Name(name) => self
                        .by_flag
                        .get(name.as_str())
                        .or_else(|| by_function.get(name.as_str()))
                        .copied(),
                    Dependency::Stage(id) => (id.0 < self.stages.len()).then_some(*id),
                };
                if let Some(id) = found {
                    ids.push(id);
                } else {
                    self.log.warn(
                        &StageError::UnresolvedDependency {
                            stage: stage.name().to_string(),
                            dependency: dependency.to_string(),
                        }
                        .to_string(),
                    );
                }
            }
            resolved.push(ids);
        }

        for (stage, ids) in self.stages.iter_mut().zip(resolved) {
            stage.resolved_dependencies = ids;
        }
    }

    /// Resolved dependencies of `id`, as stages.
    pub fn dependencies_of(&self, id: StageId) -> impl Iterator<Item = &Stage> {
        self.get(id)
            .map(Stage::resolved_dependencies)
            .unwrap_or_default()
            .iter()
            .filter_map(|dep| self.get(*dep))
    }

    /// Check that every entry of `names` is a registered flag name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownStage`] for the first unknown name.
    pub fn validate_flags<I>(&self, names: I) -> Result<(), ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            if !self.by_flag.contains_key(name) {
                return Err(ConfigError::UnknownStage {
                    name: name.to_string(),
                    known: self.flag_names().collect::<Vec<_>>().join(", "),
                });
            }
        }
        Ok(())
    }

    /// Execute every stage in registration order.
    ///
    /// All statuses are reset first, so stages the run never reaches stay
    /// [`StageStatus::NotExecuted`](super::StageStatus::NotExecuted).
    ///
    /// # Errors
    ///
    /// Returns the [`StageError::Aborted`] of the first abort-on-error stage
    /// that fails; no later stage runs.
    pub fn run(&mut self, cfg: &RunConfig, prompt: &dyn Prompt) -> Result<(), StageError> {
        for stage in &mut self.stages {
            stage.reset();
        }
        let log = self.log.as_ref();
        for stage in &mut self.stages {
            stage.execute(cfg, prompt, log)?;
        }
        Ok(())
    }

    /// Remove every stage.
    pub fn clear(&mut self) {
        self.stages.clear();
        self.by_flag.clear();
    }
}

impl<'a> IntoIterator for &'a StageRegistry {
    type Item = &'a Stage;
    type IntoIter = std::slice::Iter<'a, Stage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Identity;
    use crate::logging::RecordingLog;
    use crate::prompt::MockPrompt;
    use crate::stages::StageStatus;
    use crate::stages::test_helpers::{Calls, plain_config};

    fn registry() -> (StageRegistry, Arc<RecordingLog>) {
        let log = Arc::new(RecordingLog::default());
        let registry = StageRegistry::new(Platform::Linux, Arc::clone(&log) as Arc<dyn Log>);
        (registry, log)
    }

    fn noop(name: &str) -> Stage {
        Stage::builder(name, |_: &RunConfig| Ok(())).build()
    }

    fn no_prompt() -> MockPrompt {
        let mut prompt = MockPrompt::new();
        prompt.expect_confirm().never();
        prompt
    }

    fn statuses(registry: &StageRegistry) -> Vec<StageStatus> {
        registry.iter().map(Stage::status).collect()
    }

    // -----------------------------------------------------------------------
    // registration
    // -----------------------------------------------------------------------

    #[test]
    fn register_keeps_order_and_logs() {
        let (mut registry, log) = registry();
        let a = registry.register(noop("A")).unwrap();
        let b = registry.register(noop("B")).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(registry.flag_names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(
            log.messages("debug"),
            vec!["Register 'A' stage", "Register 'B' stage"]
        );
    }

    #[test]
    fn register_drops_other_platforms() {
        let (mut registry, _log) = registry();
        let id = registry.register(
            Stage::builder("Mac only", |_: &RunConfig| Ok(()))
                .platforms([Platform::Darwin])
                .build(),
        );
        assert!(id.is_none());
        assert!(registry.is_empty());
        assert!(registry.get_by_flag("mac-only").is_none());
    }

    #[test]
    fn register_same_flag_replaces_in_place() {
        let (mut registry, _log) = registry();
        registry.register(noop("A"));
        registry.register(noop("B"));
        let replaced = registry.register(
            Stage::builder("a", |_: &RunConfig| Ok(()))
                .details("second A")
                .build(),
        );
        assert_eq!(replaced.unwrap().index(), 0);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get_by_flag("a").unwrap().details(), "second A");
    }

    #[test]
    fn iteration_is_restartable() {
        let (mut registry, _log) = registry();
        registry.register(noop("A"));
        registry.register(noop("B"));
        let first: Vec<_> = (&registry).into_iter().map(Stage::name).collect();
        let second: Vec<_> = registry.iter().map(Stage::name).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn clear_empties_registry() {
        let (mut registry, _log) = registry();
        registry.register(noop("A"));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.id_of("a").is_none());
    }

    // -----------------------------------------------------------------------
    // dependencies
    // -----------------------------------------------------------------------

    fn check_tools(_: &RunConfig) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn resolves_by_flag_function_name_and_id() {
        let (mut registry, log) = registry();
        let tools = registry
            .register(Stage::builder("Check required tools", check_tools).build())
            .unwrap();
        let git = registry
            .register(
                Stage::builder("Configure git", |_: &RunConfig| Ok(()))
                    .depends_on("check-required-tools")
                    .build(),
            )
            .unwrap();
        let link = registry
            .register(
                Stage::builder("Link dotfiles", |_: &RunConfig| Ok(()))
                    .depends_on("check_tools")
                    .depends_on(git)
                    .build(),
            )
            .unwrap();

        registry.resolve_dependencies();

        assert_eq!(registry.get(git).unwrap().resolved_dependencies(), [tools]);
        assert_eq!(
            registry.get(link).unwrap().resolved_dependencies(),
            [tools, git]
        );
        let names: Vec<_> = registry.dependencies_of(link).map(Stage::name).collect();
        assert_eq!(names, ["Check required tools", "Configure git"]);
        assert!(log.messages("warn").is_empty());
    }

    #[test]
    fn unresolved_dependency_warns_and_is_dropped() {
        let (mut registry, log) = registry();
        let id = registry
            .register(
                Stage::builder("Link dotfiles", |_: &RunConfig| Ok(()))
                    .depends_on("install-fonts")
                    .build(),
            )
            .unwrap();

        registry.resolve_dependencies();

        assert!(registry.get(id).unwrap().resolved_dependencies().is_empty());
        let warnings = log.messages("warn");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("install-fonts"));
    }

    #[test]
    fn resolution_is_recomputed_not_accumulated() {
        let (mut registry, _log) = registry();
        registry.register(noop("A"));
        let b = registry
            .register(
                Stage::builder("B", |_: &RunConfig| Ok(()))
                    .depends_on("a")
                    .build(),
            )
            .unwrap();
        registry.resolve_dependencies();
        registry.resolve_dependencies();
        assert_eq!(registry.get(b).unwrap().resolved_dependencies().len(), 1);
    }

    #[test]
    fn dependencies_do_not_reorder_execution() {
        let (mut registry, _log) = registry();
        registry.register(
            Stage::builder("First", |_: &RunConfig| Ok(()))
                .depends_on("second")
                .build(),
        );
        registry.register(noop("Second"));
        registry.resolve_dependencies();
        let order: Vec<_> = registry.flag_names().collect();
        assert_eq!(order, ["first", "second"]);
    }

    // -----------------------------------------------------------------------
    // flag validation
    // -----------------------------------------------------------------------

    #[test]
    fn validate_flags_rejects_unknown() {
        let (mut registry, _log) = registry();
        registry.register(noop("Link dotfiles"));
        assert!(registry.validate_flags(["link-dotfiles"]).is_ok());
        let err = registry.validate_flags(["fonts"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown stage 'fonts' (known stages: link-dotfiles)"
        );
    }

    // -----------------------------------------------------------------------
    // run
    // -----------------------------------------------------------------------

    #[test]
    fn run_skip_scenario() {
        let (mut registry, _log) = registry();
        let calls = Calls::default();
        for name in ["A", "B", "C"] {
            registry.register(Stage::builder(name, calls.counting_ok()).build());
        }
        let cfg = RunConfig::builder(Identity::new("jdoe", "Jane Doe"))
            .skipped_stages(["b"])
            .build()
            .unwrap();

        registry.run(&cfg, &no_prompt()).unwrap();

        assert_eq!(
            statuses(&registry),
            [StageStatus::Success, StageStatus::Skipped, StageStatus::Success]
        );
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn run_continues_after_plain_failure() {
        let (mut registry, _log) = registry();
        let calls = Calls::default();
        registry.register(Stage::builder("A", calls.counting_err("broken")).build());
        registry.register(Stage::builder("B", calls.counting_ok()).build());

        registry.run(&plain_config(), &no_prompt()).unwrap();

        assert_eq!(
            statuses(&registry),
            [StageStatus::Failure, StageStatus::Success]
        );
    }

    #[test]
    fn run_stops_at_abort() {
        let (mut registry, _log) = registry();
        let calls = Calls::default();
        registry.register(Stage::builder("A", calls.counting_ok()).build());
        registry.register(
            Stage::builder("B", calls.counting_err("fatal"))
                .abort_on_error(true)
                .build(),
        );
        registry.register(Stage::builder("C", calls.counting_ok()).build());

        let err = registry.run(&plain_config(), &no_prompt()).unwrap_err();

        assert!(matches!(err, StageError::Aborted { ref stage, .. } if stage == "B"));
        assert_eq!(
            statuses(&registry),
            [
                StageStatus::Success,
                StageStatus::Failure,
                StageStatus::NotExecuted
            ]
        );
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn run_resets_statuses_from_previous_run() {
        let (mut registry, _log) = registry();
        let calls = Calls::default();
        registry.register(
            Stage::builder("A", calls.counting_err("fatal"))
                .abort_on_error(true)
                .build(),
        );
        registry.register(noop("B"));
        registry.run(&plain_config(), &no_prompt()).unwrap_err();

        let cfg = RunConfig::builder(Identity::new("jdoe", "Jane Doe"))
            .only_stages(["b"])
            .build()
            .unwrap();
        registry.run(&cfg, &no_prompt()).unwrap();
        assert_eq!(
            statuses(&registry),
            [StageStatus::Skipped, StageStatus::Success]
        );
    }
}
