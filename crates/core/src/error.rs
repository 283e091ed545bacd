//! Unified error types for transclusion.
//!
//! Per-importer problems never surface here; they are reported through
//! [`crate::diagnostics`] and leave a marker in the document. These are the
//! failures that abort a whole resolution session.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Unified error types for the transclusion workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty HTML).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A location could not be parsed or resolved.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// A location handed to the document cache is not in normal form.
    #[error("ABNORMAL_LOCATION: Not in normal form: {0}")]
    AbnormalLocation(String),

    /// The host document itself could not be retrieved.
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),

    /// The host document has no `body` element to resolve.
    #[error("NO_CONTENT_ROOT: {0}")]
    NoContentRoot(String),

    /// The resolution task could not run to completion.
    #[error("RESOLVE_FAILED: {0}")]
    ResolveFailed(String),
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::FetchFailed(msg) => (-32008, msg.clone()),
            Error::AbnormalLocation(uri) => (-32013, format!("Not in normal form: {uri}")),
            Error::NoContentRoot(msg) => (-32014, msg.clone()),
            Error::ResolveFailed(msg) => (-32015, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::FetchFailed("https://example.com/a: timed-out".to_string());
        assert!(err.to_string().contains("FETCH_FAILED"));
        assert!(err.to_string().contains("timed-out"));
    }

    #[test]
    fn test_abnormal_location_display() {
        let err = Error::AbnormalLocation("HTTP://Example.com".to_string());
        assert_eq!(err.to_string(), "ABNORMAL_LOCATION: Not in normal form: HTTP://Example.com");
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::InvalidInput("html cannot be empty".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32602);
        assert_eq!(mcp_err.message, "html cannot be empty");
    }

    #[test]
    fn test_abnormal_location_to_mcp_error() {
        let mcp_err: McpError = Error::AbnormalLocation("x".into()).into();
        assert_eq!(mcp_err.code.0, -32013);
        assert!(mcp_err.message.contains("Not in normal form"));
    }
}
