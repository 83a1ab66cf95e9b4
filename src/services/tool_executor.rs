use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::errors::{CallError, ToolError};
use crate::format::{render, ResponseFormat, ToolOutput};
use crate::mcp::catalog::{BodyMode, Catalog, ResponseKind, RouteDef};
use crate::services::api_client::{ApiClient, ApiPayload, RequestDescriptor};
use crate::services::logger::Logger;
use crate::services::tenant::TenantCredentials;
use crate::utils::query::build_query_string;
use crate::utils::text::apply_char_budget;

const RESERVED_ARGS: &[&str] = &["format", "page", "per_page"];

pub struct CallContext<'a> {
    pub client: &'a ApiClient,
    pub config: &'a ServerConfig,
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn resource(&self) -> &str;

    async fn handle(
        &self,
        ctx: &CallContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<ToolOutput, CallError>;
}

pub struct RouteHandler {
    route: RouteDef,
}

impl RouteHandler {
    pub fn new(route: RouteDef) -> Self {
        Self { route }
    }

    fn build_path(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let mut path = self.route.path.clone();
        for name in self.route.placeholders() {
            let raw = match args.get(name) {
                Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
                Some(Value::Number(number)) => number.to_string(),
                _ => {
                    return Err(ToolError::invalid_params(format!(
                        "{}: a non-empty string or number is required",
                        name
                    )))
                }
            };
            path = path.replace(&format!("{{{}}}", name), &urlencoding::encode(&raw));
        }
        Ok(path)
    }

    fn build_query(&self, ctx: &CallContext<'_>, args: &Map<String, Value>) -> String {
        let mut query = Map::new();
        for key in &self.route.query {
            if let Some(value) = args.get(key) {
                query.insert(key.clone(), value.clone());
            }
        }
        if self.route.is_list() {
            if let Some(page) = args.get("page") {
                query.insert("page".to_string(), page.clone());
            }
            let per_page = ctx
                .config
                .page_size(args.get("per_page").and_then(Value::as_u64));
            query.insert("per_page".to_string(), Value::from(per_page));
        }
        build_query_string(&query)
    }

    fn build_body(&self, args: &Map<String, Value>) -> Option<Value> {
        if self.route.body == BodyMode::None {
            return self.route.fixed_body.clone();
        }
        let placeholders = self.route.placeholders();
        let mut body = match &self.route.fixed_body {
            Some(Value::Object(fixed)) => fixed.clone(),
            _ => Map::new(),
        };
        for (key, value) in args {
            let consumed = RESERVED_ARGS.contains(&key.as_str())
                || placeholders.contains(&key.as_str())
                || self.route.query.iter().any(|q| q == key);
            if !consumed {
                body.insert(key.clone(), value.clone());
            }
        }
        Some(Value::Object(body))
    }

    fn descriptor(
        &self,
        ctx: &CallContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<RequestDescriptor, ToolError> {
        let path = format!("{}{}", self.build_path(args)?, self.build_query(ctx, args));
        let mut descriptor = RequestDescriptor::new(self.route.http_method()?, path);
        if let Some(body) = self.build_body(args) {
            descriptor = descriptor.with_body(body);
        }
        if let Some(accept) = &self.route.accept {
            descriptor = descriptor.with_header("Accept", accept.clone());
        }
        Ok(descriptor)
    }

    fn unwrap_entity(&self, value: Value) -> Value {
        match (&self.route.entity_key, value) {
            (Some(key), Value::Object(mut map)) if map.contains_key(key) => {
                map.remove(key).unwrap_or(Value::Null)
            }
            (_, value) => value,
        }
    }
}

#[async_trait]
impl ToolHandler for RouteHandler {
    fn resource(&self) -> &str {
        &self.route.resource
    }

    async fn handle(
        &self,
        ctx: &CallContext<'_>,
        args: &Map<String, Value>,
    ) -> Result<ToolOutput, CallError> {
        let descriptor = self.descriptor(ctx, args)?;

        if let Some(list_key) = &self.route.list_key {
            let page = ctx.client.get_page(&descriptor.path, list_key).await?;
            return Ok(ToolOutput::Page(page));
        }

        if self.route.response == ResponseKind::Binary {
            let payload = ctx.client.fetch_binary(&descriptor).await?;
            return Ok(ToolOutput::Value(json!({
                "content_type": payload.content_type,
                "size_bytes": payload.bytes.len(),
                "base64": base64::engine::general_purpose::STANDARD.encode(&payload.bytes),
            })));
        }

        let value = match ctx.client.request(&descriptor).await? {
            ApiPayload::Empty => json!({ "success": true }),
            ApiPayload::Json(value) => self.unwrap_entity(value),
            ApiPayload::Text(text) => Value::String(text),
        };
        Ok(ToolOutput::Value(value))
    }
}

#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    config: Arc<ServerConfig>,
    http: Client,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolExecutor {
    pub fn new(
        logger: Logger,
        config: Arc<ServerConfig>,
        http: Client,
        handlers: HashMap<String, Arc<dyn ToolHandler>>,
    ) -> Self {
        Self {
            logger: logger.child("executor"),
            config,
            http,
            handlers: Arc::new(handlers),
        }
    }

    pub fn from_catalog(
        logger: Logger,
        config: Arc<ServerConfig>,
        http: Client,
        catalog: &Catalog,
    ) -> Self {
        let handlers = catalog
            .tools()
            .iter()
            .map(|tool| {
                let handler: Arc<dyn ToolHandler> = Arc::new(RouteHandler::new(tool.route.clone()));
                (tool.name.clone(), handler)
            })
            .collect();
        Self::new(logger, config, http, handlers)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn execute(
        &self,
        tool_name: &str,
        args: Value,
        credentials: TenantCredentials,
    ) -> Result<String, CallError> {
        let handler = self
            .handlers
            .get(tool_name)
            .cloned()
            .ok_or_else(|| ToolError::not_found(format!("Unknown tool: {}", tool_name)))?;
        let args = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(ToolError::invalid_params("arguments must be an object").into()),
        };
        let format = ResponseFormat::from_arg(args.get("format"))?;

        let call_id = Uuid::new_v4().to_string();
        let logger = self.logger.child(&call_id);
        let client = ApiClient::new(
            self.http.clone(),
            credentials,
            self.config.engine(),
            logger.clone(),
        );
        let ctx = CallContext {
            client: &client,
            config: &self.config,
        };

        let started = Instant::now();
        let result = handler.handle(&ctx, &args).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => logger.info(
                "tool call completed",
                Some(&json!({ "tool": tool_name, "duration_ms": duration_ms })),
            ),
            Err(err) => logger.warn(
                "tool call failed",
                Some(&json!({
                    "tool": tool_name,
                    "duration_ms": duration_ms,
                    "error": err.to_string(),
                })),
            ),
        }

        let output = result?;
        let text = render(&output, format, handler.resource());
        Ok(apply_char_budget(text, self.config.response_char_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::api_client::build_http_client;

    fn route(name: &str) -> RouteHandler {
        let catalog = Catalog::builtin(&ServerConfig::default()).expect("catalog");
        RouteHandler::new(catalog.get(name).expect("tool").route.clone())
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    fn with_ctx<T>(f: impl FnOnce(&CallContext<'_>) -> T) -> T {
        let config = ServerConfig::default();
        let client = ApiClient::new(
            build_http_client().expect("client"),
            TenantCredentials::new("t"),
            config.engine(),
            Logger::new("test"),
        );
        f(&CallContext {
            client: &client,
            config: &config,
        })
    }

    #[test]
    fn path_placeholders_are_filled_and_encoded() {
        let handler = route("get_domain_record");
        let path = handler
            .build_path(&args(json!({"domain_name": "a b.com", "record_id": 42})))
            .expect("path");
        assert_eq!(path, "/domains/a%20b.com/records/42");

        let err = handler
            .build_path(&args(json!({"domain_name": "", "record_id": 1})))
            .expect_err("empty");
        assert!(err.message.contains("domain_name"));
    }

    #[test]
    fn list_routes_default_and_clamp_per_page() {
        with_ctx(|ctx| {
            let handler = route("list_droplets");
            let desc = handler
                .descriptor(ctx, &args(json!({"page": 2, "tag_name": "web"})))
                .expect("descriptor");
            assert_eq!(desc.path, "/droplets?page=2&per_page=20&tag_name=web");
            assert!(desc.body.is_none());

            let desc = handler
                .descriptor(ctx, &args(json!({"per_page": 10_000})))
                .expect("descriptor");
            assert_eq!(desc.path, "/droplets?per_page=200");
        });
    }

    #[test]
    fn action_routes_layer_args_over_fixed_body() {
        with_ctx(|ctx| {
            let handler = route("resize_droplet");
            let desc = handler
                .descriptor(
                    ctx,
                    &args(json!({"droplet_id": 7, "size": "s-2vcpu-4gb", "format": "markdown"})),
                )
                .expect("descriptor");
            assert_eq!(desc.method, reqwest::Method::POST);
            assert_eq!(desc.path, "/droplets/7/actions");
            assert_eq!(
                desc.body,
                Some(json!({"type": "resize", "size": "s-2vcpu-4gb"}))
            );
        });
    }

    #[test]
    fn binary_routes_request_their_content_type() {
        with_ctx(|ctx| {
            let handler = route("get_invoice_pdf");
            let desc = handler
                .descriptor(ctx, &args(json!({"invoice_uuid": "inv-1"})))
                .expect("descriptor");
            assert_eq!(desc.headers.get("Accept").map(String::as_str), Some("application/pdf"));
            assert!(desc.body.is_none());
        });
    }

    #[test]
    fn entity_envelope_is_unwrapped_when_present() {
        let handler = route("get_droplet");
        let unwrapped = handler.unwrap_entity(json!({"droplet": {"id": 1}, "links": {}}));
        assert_eq!(unwrapped, json!({"id": 1}));
        let untouched = handler.unwrap_entity(json!({"id": 1}));
        assert_eq!(untouched, json!({"id": 1}));
    }
}
