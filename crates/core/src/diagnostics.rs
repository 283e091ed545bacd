//! Diagnostic reporting for broken or unreachable content.
//!
//! Problems an author could fix (a fragment that names no element, an exporting
//! document without a body) are reported as errors, and additionally raised as
//! alerts when the requester is taken to be the author. Transient problems such
//! as failed fetches are only warned about.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Destination for diagnostic messages.
pub trait DiagnosticSink {
    fn warn(&self, message: &str);

    fn error(&self, message: &str);

    /// Raise a message for the attention of the content's author.
    fn alert(&self, message: &str);
}

/// Severity of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Warning,
    Error,
    Alert,
}

/// A diagnostic message recorded by [`CollectingSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

/// Sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn alert(&self, message: &str) {
        tracing::error!(alert = true, "{}", message);
    }
}

/// Sink that logs and also records every message for later inspection.
///
/// Clones share the same record, so one handle can be given to a [`Reporter`]
/// while another is kept to read the results.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    records: Rc<RefCell<Vec<Diagnostic>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, level: Level, message: &str) {
        self.records
            .borrow_mut()
            .push(Diagnostic { level, message: message.to_string() });
    }

    /// Snapshot of the messages recorded so far.
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.borrow().clone()
    }

    /// Remove and return the messages recorded so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.records.borrow_mut())
    }
}

impl DiagnosticSink for CollectingSink {
    fn warn(&self, message: &str) {
        TracingSink.warn(message);
        self.record(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        TracingSink.error(message);
        self.record(Level::Error, message);
    }

    fn alert(&self, message: &str) {
        TracingSink.alert(message);
        self.record(Level::Alert, message);
    }
}

/// Routes diagnostics to a sink according to who is likely reading them.
pub struct Reporter {
    sink: Box<dyn DiagnosticSink>,
    author_mode: bool,
}

impl Reporter {
    /// Create a reporter. `author_mode` says whether the requester can likely edit the content.
    pub fn new(sink: Box<dyn DiagnosticSink>, author_mode: bool) -> Self {
        Self { sink, author_mode }
    }

    /// A reporter that only logs.
    pub fn tracing(author_mode: bool) -> Self {
        Self::new(Box::new(TracingSink), author_mode)
    }

    pub fn author_mode(&self) -> bool {
        self.author_mode
    }

    /// Report a problem the author is not necessarily able to act on.
    pub fn warn(&self, message: &str) {
        self.sink.warn(message);
    }

    /// Report malformed content, or any other problem the author might be able to redress.
    pub fn malformed(&self, message: &str) {
        self.sink.error(message);
        if self.author_mode {
            self.sink.alert(message);
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").field("author_mode", &self.author_mode).finish_non_exhaustive()
    }
}
