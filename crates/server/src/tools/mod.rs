//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-transclude server, and
//! the plumbing they share for running a transclusion session.

pub mod transclude_html;
pub mod transclude_open;

pub use transclude_html::TranscludeHtmlParams;
pub use transclude_open::TranscludeOpenParams;

use std::future::Future;

use chrono::Utc;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use transclude_client::Transcluded;
use transclude_core::{AppConfig, CollectingSink, Diagnostic, DiagnosticSink, Error, Level};

/// Output structure shared by the transclusion tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscludeOutput {
    /// Location of the host document, without fragment.
    pub url: String,
    /// ISO8601 timestamp of when resolution finished.
    pub resolved_at: String,
    /// The resolved document as HTML.
    pub html: String,
    /// Number of importers replaced by their content.
    pub imported: usize,
    /// Number of importers left in place with a failure marker.
    pub unresolved: usize,
    /// Problems reported while resolving.
    pub diagnostics: Vec<DiagnosticEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiagnosticEntry {
    /// "warning", "error" or "alert".
    pub level: String,
    pub message: String,
}

impl From<Diagnostic> for DiagnosticEntry {
    fn from(diagnostic: Diagnostic) -> Self {
        let level = match diagnostic.level {
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Alert => "alert",
        };
        Self { level: level.into(), message: diagnostic.message }
    }
}

/// Applies per-call overrides to the server configuration.
pub(crate) fn with_overrides(config: &AppConfig, max_depth: Option<usize>, author_mode: Option<bool>) -> AppConfig {
    let mut config = config.clone();
    if let Some(max_depth) = max_depth {
        config.max_depth = max_depth;
    }
    if author_mode.is_some() {
        config.author_mode = author_mode;
    }
    config
}

/// Runs a transclusion session on a dedicated thread.
///
/// Documents are not `Send`, so a session cannot run on the server's worker
/// threads. It gets a single-threaded runtime of its own on the blocking pool,
/// and hands back the resolved document with every diagnostic it reported.
pub(crate) async fn run_session<F, Fut>(session: F) -> Result<(Transcluded, Vec<Diagnostic>), Error>
where
    F: FnOnce(Box<dyn DiagnosticSink>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Transcluded, Error>> + 'static,
{
    tokio::task::spawn_blocking(move || -> Result<(Transcluded, Vec<Diagnostic>), Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::ResolveFailed(format!("failed to start session runtime: {e}")))?;

        let sink = CollectingSink::new();
        let transcluded = runtime.block_on(session(Box::new(sink.clone())))?;
        Ok((transcluded, sink.take()))
    })
    .await
    .map_err(|e| Error::ResolveFailed(format!("session task failed: {e}")))?
}

/// Renders a finished session as the tool result.
pub(crate) fn render(transcluded: Transcluded, diagnostics: Vec<Diagnostic>) -> CallToolResult {
    let output = TranscludeOutput {
        url: transcluded.location.to_string(),
        resolved_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        html: transcluded.html,
        imported: transcluded.report.imported,
        unresolved: transcluded.report.unresolved,
        diagnostics: diagnostics.into_iter().map(DiagnosticEntry::from).collect(),
    };

    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )])
}
