//! The [`Log`] trait and the indentation guard shared by all backends.

/// Name of the span entered by [`IndentGuard`].
pub(super) const INDENT_SPAN: &str = "indent";

/// Abstraction over logging backends.
///
/// The stage engine and the dotfile manager log through this trait so that
/// tests can substitute an isolated logger.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Nest every message logged on this thread one level deeper until the
    /// returned guard is dropped.
    fn indent(&self) -> IndentGuard {
        IndentGuard::enter()
    }
}

/// Keeps one level of indentation active while alive.
///
/// Backed by an entered [`tracing`] span; the console and file layers indent
/// each event by the number of enclosing indent spans. Dropping the guard
/// exits the span, so the previous level is restored on every exit path,
/// including `?` and panics.
#[derive(Debug)]
#[must_use = "indentation ends as soon as the guard is dropped"]
pub struct IndentGuard {
    _span: tracing::span::EnteredSpan,
}

impl IndentGuard {
    /// Enter a new indentation level.
    pub fn enter() -> Self {
        Self {
            _span: tracing::info_span!(target: "dotfiles_installer::indent", "indent").entered(),
        }
    }
}
