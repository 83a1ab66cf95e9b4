mod api_error;
mod mcp_error;
mod tool_error;

pub use api_error::{ApiError, ApiErrorKind, AUTHENTICATION_FAILED_MESSAGE};
pub use mcp_error::{ErrorCode, McpError};
pub use tool_error::{ToolError, ToolErrorKind};

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CallError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Tool(#[from] ToolError),
}
