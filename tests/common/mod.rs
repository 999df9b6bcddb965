// Shared helpers for integration tests.
//
// Provides a scripted prompt, a recording log, and a temporary-directory
// backed environment so each integration test can build a registry without
// touching the real home directory or reading stdin.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{Local, TimeZone as _};

use dotfiles_installer::config::{Identity, RunConfig};
use dotfiles_installer::dotfiles::DotfileManager;
use dotfiles_installer::error::PromptError;
use dotfiles_installer::logging::Log;
use dotfiles_installer::platform::Platform;
use dotfiles_installer::prompt::Prompt;
use dotfiles_installer::stages::builtin::Environment;

/// A [`Prompt`] answering from a fixed script and recording every question.
///
/// Running out of answers behaves like closed stdin.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: RefCell<VecDeque<bool>>,
    questions: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: RefCell::new(answers.into_iter().collect()),
            questions: RefCell::default(),
        }
    }

    /// Questions asked so far, in order.
    pub fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, question: &str, _default: Option<bool>) -> Result<bool, PromptError> {
        self.questions.borrow_mut().push(question.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or(PromptError::EndOfInput)
    }
}

/// A [`Log`] keeping every message in memory, prefixed by its level.
#[derive(Debug, Default)]
pub struct CollectingLog {
    lines: Mutex<Vec<String>>,
}

impl CollectingLog {
    fn push(&self, level: &str, msg: &str) {
        self.lines.lock().unwrap().push(format!("{level}: {msg}"));
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Log for CollectingLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
}

/// A run configuration with no filters for a fixed user on Linux.
pub fn config() -> RunConfig {
    RunConfig::builder(Identity::new("jdoe", "Jane Doe"))
        .platform(Platform::Linux)
        .timestamp(Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().unwrap())
        .build()
        .unwrap()
}

/// Temporary repository root and home directory for the built-in stages.
pub struct IntegrationTestContext {
    pub root: tempfile::TempDir,
    pub home: tempfile::TempDir,
    pub log: Arc<CollectingLog>,
}

impl IntegrationTestContext {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create root dir"),
            home: tempfile::tempdir().expect("create home dir"),
            log: Arc::new(CollectingLog::default()),
        }
    }

    pub fn dyn_log(&self) -> Arc<dyn Log> {
        Arc::clone(&self.log) as Arc<dyn Log>
    }

    /// Write `content` to `<root>/home/<relative>`, creating parents.
    pub fn add_dotfile(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.path().join("home").join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn home_path(&self) -> &Path {
        self.home.path()
    }

    pub fn environment(&self, config: &RunConfig) -> Arc<Environment> {
        Arc::new(Environment {
            root: self.root.path().to_path_buf(),
            home: self.home.path().to_path_buf(),
            dotfiles: Arc::new(DotfileManager::new(config.timestamp(), self.dyn_log())),
            log: self.dyn_log(),
        })
    }
}
