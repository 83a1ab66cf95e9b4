use crate::app::App;
use crate::errors::{CallError, ErrorCode, McpError, ToolError};
use crate::mcp::catalog::Catalog;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use crate::mcp::response::{error_result, success_result};
use crate::services::logger::Logger;
use crate::services::tenant::{headers_from_env, resolve_from_headers};
use crate::services::tool_executor::ToolExecutor;
use axum::http::HeaderMap;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "digitalocean";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct McpServer {
    catalog: Arc<Catalog>,
    executor: ToolExecutor,
    logger: Logger,
}

impl McpServer {
    pub fn new(catalog: Arc<Catalog>, executor: ToolExecutor, logger: Logger) -> Self {
        Self {
            catalog,
            executor,
            logger: logger.child("rpc"),
        }
    }

    pub fn from_app(app: &App) -> Self {
        Self::new(app.catalog.clone(), app.executor.clone(), app.logger.clone())
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
        })
    }

    fn handle_tools_list(&self) -> Value {
        self.catalog.list_tools()
    }

    async fn handle_tools_call(
        &self,
        params: &Value,
        headers: &HeaderMap,
    ) -> Result<Value, McpError> {
        let params = params.as_object().cloned().unwrap_or_default();
        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or("");
        if name.is_empty() {
            return Err(McpError::new(ErrorCode::InvalidParams, "Missing tool name"));
        }
        let tool = self.catalog.require(name)?;

        let args = match params.get("arguments") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(Value::Object(map)) => Value::Object(map.clone()),
            Some(_) => {
                return Err(McpError::new(
                    ErrorCode::InvalidParams,
                    "arguments must be an object",
                ))
            }
        };
        self.catalog.validate_args(&tool.name, &args)?;

        let credentials = match resolve_from_headers(headers) {
            Ok(credentials) => credentials,
            Err(err) => {
                self.logger.warn(
                    "tool call rejected: no credentials",
                    Some(&json!({ "tool": tool.name })),
                );
                return Ok(error_result(&CallError::Api(err)));
            }
        };

        match self.executor.execute(&tool.name, args, credentials).await {
            Ok(text) => Ok(success_result(text)),
            Err(err) => Ok(error_result(&err)),
        }
    }

    pub async fn dispatch(
        &self,
        request: JsonRpcRequest,
        headers: &HeaderMap,
    ) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return request.id.map(|id| {
                JsonRpcResponse::failure(id, ErrorCode::InvalidRequest.as_i32(), "Invalid request")
            });
        }
        if request.is_notification() {
            self.logger
                .debug("notification", Some(&json!({ "method": request.method })));
            return None;
        }
        let id = request.id.unwrap_or(Value::Null);

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(&request.params, headers).await,
            method if method.starts_with("notifications/") => Ok(json!({})),
            method => Err(McpError::new(
                ErrorCode::MethodNotFound,
                format!("Method not found: {}", method),
            )),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::from_error(id, err),
        })
    }

    pub async fn handle_message(
        &self,
        raw: &str,
        headers: &HeaderMap,
    ) -> Option<JsonRpcResponse> {
        let parsed: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(_) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    ErrorCode::ParseError.as_i32(),
                    "Parse error",
                ))
            }
        };
        let id = parsed.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(parsed) {
            Ok(request) => self.dispatch(request, headers).await,
            Err(_) => Some(JsonRpcResponse::failure(
                id,
                ErrorCode::InvalidRequest.as_i32(),
                "Invalid request",
            )),
        }
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        let mut reader = BufReader::new(tokio::io::stdin()).lines();
        let mut writer = BufWriter::new(tokio::io::stdout());
        self.logger.info(
            "stdio transport ready",
            Some(&json!({ "tools": self.catalog.len() })),
        );

        while let Some(line) = reader.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let headers = headers_from_env();
            let Some(response) = self.handle_message(trimmed, &headers).await else {
                continue;
            };
            let payload = serde_json::to_string(&response)
                .map_err(|err| ToolError::internal(format!("response encode failed: {}", err)))?;
            writer.write_all(payload.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        self.logger.info("stdin closed, shutting down", None);
        Ok(())
    }
}

pub async fn run_stdio(app: &App) -> Result<(), ToolError> {
    McpServer::from_app(app).run_stdio().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::services::api_client::build_http_client;

    fn server() -> McpServer {
        let config = ServerConfig::default();
        let catalog = Arc::new(Catalog::builtin(&config).expect("catalog"));
        let logger = Logger::new("test");
        let executor = ToolExecutor::from_catalog(
            logger.clone(),
            Arc::new(config),
            build_http_client().expect("client"),
            &catalog,
        );
        McpServer::new(catalog, executor, logger)
    }

    async fn call(server: &McpServer, raw: &str) -> Value {
        let response = server
            .handle_message(raw, &HeaderMap::new())
            .await
            .expect("response");
        serde_json::to_value(&response).expect("serializes")
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
        let value = call(&server(), raw).await;
        assert_eq!(value["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(value["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let out = server()
            .handle_message(
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                &HeaderMap::new(),
            )
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn protocol_failures_use_jsonrpc_codes() {
        let server = server();
        let value = call(&server, "{not json").await;
        assert_eq!(value["error"]["code"], -32700);

        let value = call(&server, r#"{"jsonrpc":"2.0","id":2}"#).await;
        assert_eq!(value["error"]["code"], -32600);
        assert_eq!(value["id"], 2);

        let value = call(&server, r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#).await;
        assert_eq!(value["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn missing_tool_name_is_invalid_params() {
        let value = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"arguments":{}}}"#,
        )
        .await;
        assert_eq!(value["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn missing_token_is_an_error_result_not_an_rpc_error() {
        let value = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"get_account"}}"#,
        )
        .await;
        assert!(value.get("error").is_none());
        assert_eq!(value["result"]["isError"], true);
        assert_eq!(
            value["result"]["structuredContent"]["error"]["kind"],
            "authentication"
        );
    }

    #[tokio::test]
    async fn ping_answers_empty_object() {
        let value = call(&server(), r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#).await;
        assert_eq!(value["result"], json!({}));
    }
}
