#![allow(dead_code)]

use axum::http::{HeaderMap, HeaderValue};
use digitalocean_mcp::config::ServerConfig;
use digitalocean_mcp::mcp::catalog::Catalog;
use digitalocean_mcp::mcp::server::McpServer;
use digitalocean_mcp::services::api_client::{build_http_client, ApiClient};
use digitalocean_mcp::services::logger::Logger;
use digitalocean_mcp::services::tenant::TenantCredentials;
use digitalocean_mcp::services::tool_executor::ToolExecutor;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const TEST_TOKEN: &str = "dop_v1_test";

pub fn restore_env(key: &str, previous: Option<String>) {
    match previous {
        Some(value) => std::env::set_var(key, value),
        None => std::env::remove_var(key),
    }
}

pub fn engine(base_url: &str) -> ApiClient {
    engine_with(base_url, ServerConfig::default())
}

pub fn engine_with(base_url: &str, config: ServerConfig) -> ApiClient {
    ApiClient::new(
        build_http_client().expect("http client"),
        TenantCredentials::new(TEST_TOKEN).with_base_url(base_url),
        config.engine(),
        Logger::new("test"),
    )
}

pub fn server() -> McpServer {
    server_with(ServerConfig::default())
}

pub fn server_with(config: ServerConfig) -> McpServer {
    let catalog = Arc::new(Catalog::builtin(&config).expect("catalog"));
    let logger = Logger::new("test");
    let executor = ToolExecutor::from_catalog(
        logger.clone(),
        Arc::new(config),
        build_http_client().expect("http client"),
        &catalog,
    );
    McpServer::new(catalog, executor, logger)
}

pub fn tenant_headers(base_url: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-digitalocean-token", HeaderValue::from_static(TEST_TOKEN));
    headers.insert(
        "x-digitalocean-base-url",
        HeaderValue::from_str(base_url).expect("header value"),
    );
    headers
}

pub fn tools_call(id: u64, name: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
    .to_string()
}

/// Sends one `tools/call` and returns the serialized JSON-RPC response.
pub async fn call_tool(
    server: &McpServer,
    headers: &HeaderMap,
    name: &str,
    arguments: Value,
) -> Value {
    let raw = tools_call(1, name, arguments);
    let response = server
        .handle_message(&raw, headers)
        .await
        .expect("tools/call always answers");
    serde_json::to_value(&response).expect("response serializes")
}

pub fn result_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content")
}
