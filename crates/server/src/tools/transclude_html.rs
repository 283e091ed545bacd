//! transclude_html tool implementation.
//!
//! Resolves the content importers of HTML supplied by the client. Only the
//! exporting documents are fetched.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use transclude_client::transclude_html;
use transclude_core::{AppConfig, Error};

use super::{render, run_session, with_overrides};

/// Input parameters for transclude_html tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscludeHtmlParams {
    /// The host document's HTML.
    pub html: String,

    /// Absolute location the HTML is taken to come from.
    /// Relative importer references resolve against it.
    pub base_url: String,

    /// Maximum nesting depth of imports (0 for unbounded). Defaults to the server configuration.
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Report broken importers as alerts for the author.
    /// Defaults to true for file locations, false otherwise.
    #[serde(default)]
    pub author_mode: Option<bool>,
}

/// Implementation of the transclude_html tool.
pub async fn html_impl(config: &AppConfig, params: TranscludeHtmlParams) -> Result<CallToolResult, McpError> {
    if params.html.is_empty() {
        return Err(Error::InvalidInput("html cannot be empty".into()).into());
    }
    if params.base_url.trim().is_empty() {
        return Err(Error::InvalidInput("base_url cannot be empty".into()).into());
    }

    let config = with_overrides(config, params.max_depth, params.author_mode);
    let TranscludeHtmlParams { html, base_url, .. } = params;

    let (transcluded, diagnostics) =
        run_session(move |sink| async move { transclude_html(&config, &html, &base_url, sink).await }).await?;

    Ok(render(transcluded, diagnostics))
}
