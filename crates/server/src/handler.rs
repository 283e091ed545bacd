//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::transclude_html::{TranscludeHtmlParams, html_impl};
use crate::tools::transclude_open::{TranscludeOpenParams, open_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use transclude_core::AppConfig;

/// The main MCP server handler for mcp-transclude.
#[derive(Clone)]
pub struct McpTranscludeServer {
    tool_router: ToolRouter<Self>,
    config: AppConfig,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl McpTranscludeServer {
    /// Create a new server handler.
    pub fn new(config: AppConfig) -> Self {
        Self { tool_router: Self::tool_router(), config }
    }

    /// Fetch a document and resolve its content importers.
    ///
    /// Every `a` element with `rel="content-repository"` is replaced by the content it links to,
    /// recursively. Importers that cannot be resolved stay in place, followed by a failure notice.
    #[tool(
        description = "Fetch an HTML document and resolve its content importers (links with rel=\"content-repository\"), splicing in the linked content recursively. Returns the resolved HTML, outcome counts and diagnostics."
    )]
    async fn transclude_open(&self, params: Parameters<TranscludeOpenParams>) -> Result<CallToolResult, McpError> {
        open_impl(&self.config, params.0).await
    }

    /// Resolve the content importers of caller-supplied HTML.
    ///
    /// Only exporting documents are fetched; the host document is the given HTML.
    #[tool(
        description = "Resolve the content importers (links with rel=\"content-repository\") of the given HTML, taken to be located at base_url. Returns the resolved HTML, outcome counts and diagnostics."
    )]
    async fn transclude_html(&self, params: Parameters<TranscludeHtmlParams>) -> Result<CallToolResult, McpError> {
        html_impl(&self.config, params.0).await
    }
}

impl ServerHandler for McpTranscludeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-transclude".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_listed() {
        let server = McpTranscludeServer::new(AppConfig::default());
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["transclude_html", "transclude_open"]);
    }

    #[test]
    fn test_server_info() {
        let info = McpTranscludeServer::new(AppConfig::default()).get_info();
        assert_eq!(info.server_info.name, "mcp-transclude");
        assert!(info.capabilities.tools.is_some());
    }
}
