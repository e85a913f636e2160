//! Shared utilities for lmu

use rmcp::ErrorData as McpError;

/// Create an internal error
pub fn internal_error(msg: impl Into<String>) -> McpError {
    McpError::internal_error(msg.into(), None)
}
