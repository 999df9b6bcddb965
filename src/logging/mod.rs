//! Logging infrastructure for structured console and file output.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{IndentGuard, Log};

/// Serializes `XDG_CACHE_HOME` manipulation across parallel test threads.
#[cfg(test)]
pub(crate) static TEST_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Create a Logger backed by an isolated per-thread tracing subscriber
/// with a [`FileLayer`](subscriber::FileLayer), so that tracing events
/// emitted by logger methods actually reach the log file during tests.
///
/// Returns a [`tracing::dispatcher::DefaultGuard`] that must be kept alive
/// for the duration of the test. Dropping it restores the previous
/// thread-local dispatcher.
#[cfg(test)]
#[allow(clippy::expect_used, unsafe_code)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let env_lock = TEST_ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    // SAFETY: Protected by TEST_ENV_MUTEX; restored before lock is released.
    unsafe {
        std::env::set_var("XDG_CACHE_HOME", tmp.path());
    }
    let file_layer = subscriber::FileLayer::new("test").expect("failed to create file layer");
    let log = Logger::new("test");
    // SAFETY: Still holding TEST_ENV_MUTEX.
    unsafe {
        std::env::remove_var("XDG_CACHE_HOME");
    }
    drop(env_lock);
    let subscriber =
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (log, tmp, guard)
}

/// In-memory [`Log`] that records every message with its level, for tests
/// asserting on what a component reported.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingLog {
    entries: std::sync::Mutex<Vec<(&'static str, String)>>,
}

#[cfg(test)]
impl RecordingLog {
    fn push(&self, level: &'static str, msg: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, msg.to_string()));
        }
    }

    /// All recorded messages at `level` (`"stage"`, `"info"`, `"debug"`,
    /// `"warn"` or `"error"`).
    pub(crate) fn messages(&self, level: &str) -> Vec<String> {
        self.entries.lock().map_or_else(
            |_| vec![],
            |entries| {
                entries
                    .iter()
                    .filter(|(l, _)| *l == level)
                    .map(|(_, m)| m.clone())
                    .collect()
            },
        )
    }

    /// Whether any message at any level contains `needle`.
    pub(crate) fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .is_ok_and(|entries| entries.iter().any(|(_, m)| m.contains(needle)))
    }
}

#[cfg(test)]
impl Log for RecordingLog {
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
