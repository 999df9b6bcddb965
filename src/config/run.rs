//! The immutable per-run configuration shared by every stage.
use std::collections::BTreeSet;

use chrono::{DateTime, Local};

use super::Identity;
use crate::error::ConfigError;
use crate::platform::Platform;

/// Settings for one installer run.
///
/// Built once through [`RunConfig::builder`] and never mutated afterwards.
/// The `with_*` methods return a modified copy; none of them touch the
/// skip/only sets, so the mutual-exclusion invariant checked in
/// [`RunConfigBuilder::build`] always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    confirm_all_stages: bool,
    skipped_stages: BTreeSet<String>,
    only_stages: BTreeSet<String>,
    platform: Platform,
    timestamp: DateTime<Local>,
    identity: Identity,
}

impl RunConfig {
    /// Start building a configuration for the current platform and time.
    #[must_use]
    pub fn builder(identity: Identity) -> RunConfigBuilder {
        RunConfigBuilder {
            confirm_all_stages: false,
            skipped_stages: BTreeSet::new(),
            only_stages: BTreeSet::new(),
            platform: Platform::current(),
            timestamp: Local::now(),
            identity,
        }
    }

    /// Whether interactive stages run without asking.
    #[must_use]
    pub const fn confirm_all_stages(&self) -> bool {
        self.confirm_all_stages
    }

    /// Flag names excluded from this run.
    #[must_use]
    pub const fn skipped_stages(&self) -> &BTreeSet<String> {
        &self.skipped_stages
    }

    /// Flag names selected for this run; empty means "all".
    #[must_use]
    pub const fn only_stages(&self) -> &BTreeSet<String> {
        &self.only_stages
    }

    /// Platform the run targets.
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    /// Instant the run started; drives backup file naming.
    #[must_use]
    pub const fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }

    /// The user the machine is set up for.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Email address of the identity, if known.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.identity.email.as_deref()
    }

    /// Whether the skip/only filters let `flag_name` through.
    ///
    /// Only the CLI filters are considered; predicates and confirmation are
    /// evaluated by the stage itself.
    #[must_use]
    pub fn selects(&self, flag_name: &str) -> bool {
        !self.skipped_stages.contains(flag_name)
            && (self.only_stages.is_empty() || self.only_stages.contains(flag_name))
    }

    /// Copy of this configuration with `email` replacing the identity's email.
    #[must_use]
    pub fn with_email(&self, email: impl Into<String>) -> Self {
        let mut identity = self.identity.clone();
        identity.email = Some(email.into());
        self.with_identity(identity)
    }

    /// Copy of this configuration with a different identity.
    #[must_use]
    pub fn with_identity(&self, identity: Identity) -> Self {
        Self {
            identity,
            ..self.clone()
        }
    }

    /// Copy of this configuration with the confirm-all flag replaced.
    #[must_use]
    pub fn with_confirm_all_stages(&self, confirm_all_stages: bool) -> Self {
        Self {
            confirm_all_stages,
            ..self.clone()
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    confirm_all_stages: bool,
    skipped_stages: BTreeSet<String>,
    only_stages: BTreeSet<String>,
    platform: Platform,
    timestamp: DateTime<Local>,
    identity: Identity,
}

impl RunConfigBuilder {
    /// Run interactive stages without asking.
    #[must_use]
    pub const fn confirm_all_stages(mut self, confirm: bool) -> Self {
        self.confirm_all_stages = confirm;
        self
    }

    /// Flag names to skip.
    #[must_use]
    pub fn skipped_stages<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skipped_stages = stages.into_iter().map(Into::into).collect();
        self
    }

    /// Flag names to run exclusively.
    #[must_use]
    pub fn only_stages<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_stages = stages.into_iter().map(Into::into).collect();
        self
    }

    /// Override the detected platform.
    #[must_use]
    pub const fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Override the run start time.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Email address for stages that need one.
    #[must_use]
    pub fn email(mut self, email: Option<String>) -> Self {
        self.identity.email = email;
        self
    }

    /// Finish the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConflictingFilters`] if both a skip list and an
    /// only list were given.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        if !self.skipped_stages.is_empty() && !self.only_stages.is_empty() {
            return Err(ConfigError::ConflictingFilters);
        }
        Ok(RunConfig {
            confirm_all_stages: self.confirm_all_stages,
            skipped_stages: self.skipped_stages,
            only_stages: self.only_stages,
            platform: self.platform,
            timestamp: self.timestamp,
            identity: self.identity,
        })
    }
}
