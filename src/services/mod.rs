pub mod api_client;
pub mod logger;
pub mod tenant;
pub mod tool_executor;
