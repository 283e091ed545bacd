//! transclude_open tool implementation.
//!
//! Fetches a document and resolves its content importers.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use transclude_client::transclude_location;
use transclude_core::{AppConfig, Error};

use super::{render, run_session, with_overrides};

/// Input parameters for transclude_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscludeOpenParams {
    /// Absolute location of the host document (http, https or file).
    pub url: String,

    /// Maximum nesting depth of imports (0 for unbounded). Defaults to the server configuration.
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Report broken importers as alerts for the author.
    /// Defaults to true for file locations, false otherwise.
    #[serde(default)]
    pub author_mode: Option<bool>,
}

/// Implementation of the transclude_open tool.
pub async fn open_impl(config: &AppConfig, params: TranscludeOpenParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let config = with_overrides(config, params.max_depth, params.author_mode);
    let url = params.url;
    tracing::debug!(url = %url, "transclude_open");

    let (transcluded, diagnostics) =
        run_session(move |sink| async move { transclude_location(&config, &url, sink).await }).await?;

    Ok(render(transcluded, diagnostics))
}
