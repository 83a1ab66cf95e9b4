use crate::config::EngineConfig;
use crate::constants::{limits, provider};
use crate::errors::{ApiError, ToolError, AUTHENTICATION_FAILED_MESSAGE};
use crate::services::logger::Logger;
use crate::services::tenant::TenantCredentials;
use crate::utils::pagination::{normalize_page, PageDescriptor};
use crate::utils::text::truncate_utf8_prefix;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: HashMap<String, String>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HashMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    Empty,
    Json(Value),
    Text(String),
}

impl ApiPayload {
    pub fn into_value(self) -> Value {
        match self {
            ApiPayload::Empty => Value::Null,
            ApiPayload::Json(value) => value,
            ApiPayload::Text(text) => Value::String(text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BinaryPayload {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub fn build_http_client() -> Result<Client, ToolError> {
    Client::builder()
        .user_agent(provider::USER_AGENT)
        .build()
        .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    credentials: TenantCredentials,
    config: EngineConfig,
    logger: Logger,
}

impl ApiClient {
    pub fn new(
        http: Client,
        credentials: TenantCredentials,
        config: EngineConfig,
        logger: Logger,
    ) -> Self {
        Self {
            http,
            credentials,
            config,
            logger: logger.child("engine"),
        }
    }

    pub fn base_url(&self) -> &str {
        self.credentials.resolve_base_url(&self.config.default_base_url)
    }

    pub async fn request(&self, descriptor: &RequestDescriptor) -> Result<ApiPayload, ApiError> {
        let response = self.send(descriptor).await?;
        decode_success(response).await
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<T, ApiError> {
        let value = self.request(descriptor).await?.into_value();
        serde_json::from_value(value)
            .map_err(|err| ApiError::transport(format!("response decode failed: {}", err)))
    }

    pub async fn get_page(
        &self,
        path_and_query: &str,
        list_key: &str,
    ) -> Result<PageDescriptor<Value>, ApiError> {
        let payload = self.request(&RequestDescriptor::get(path_and_query)).await?;
        Ok(normalize_page(&payload.into_value(), list_key))
    }

    pub async fn fetch_binary(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<BinaryPayload, ApiError> {
        let response = self.send(descriptor).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(BinaryPayload {
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    async fn send(&self, descriptor: &RequestDescriptor) -> Result<Response, ApiError> {
        if self.credentials.token.trim().is_empty() {
            return Err(ApiError::missing_token());
        }

        let url = join_url(self.base_url(), &descriptor.path);
        let headers = self.build_headers(&descriptor.headers);

        let mut req = self
            .http
            .request(descriptor.method.clone(), url)
            .headers(headers)
            .timeout(Duration::from_millis(self.config.request_timeout_ms));
        if let Some(body) = descriptor.body.as_ref() {
            let text = serde_json::to_string(body)
                .map_err(|err| ApiError::transport(format!("body encode failed: {}", err)))?;
            req = req.body(text);
        }

        let started = Instant::now();
        let response = req.send().await.map_err(|err| {
            let mapped = map_reqwest_error(err);
            self.logger.warn(
                "request failed",
                Some(&serde_json::json!({
                    "method": descriptor.method.as_str(),
                    "path": descriptor.path,
                    "error": mapped.message,
                })),
            );
            mapped
        })?;
        let status = response.status();
        self.logger.debug(
            "request",
            Some(&serde_json::json!({
                "method": descriptor.method.as_str(),
                "path": descriptor.path,
                "status": status.as_u16(),
                "duration_ms": started.elapsed().as_millis() as u64,
            })),
        );

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.bytes().await.unwrap_or_default();
        let err = classify_failure(status, retry_after.as_deref(), &body, &self.config);
        self.logger.warn(
            "API error",
            Some(&serde_json::json!({
                "method": descriptor.method.as_str(),
                "path": descriptor.path,
                "status": status.as_u16(),
                "kind": err.kind.as_str(),
            })),
        );
        Err(err)
    }

    fn build_headers(&self, overrides: &HashMap<String, String>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.credentials.token.trim());
        if let Ok(value) = HeaderValue::from_str(&bearer) {
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (key, value) in overrides {
            let name = HeaderName::from_bytes(key.as_bytes());
            let val = HeaderValue::from_str(value);
            match (name, val) {
                (Ok(name), Ok(val)) => {
                    headers.insert(name, val);
                }
                _ => self
                    .logger
                    .warn("dropping invalid header override", Some(&Value::String(key.clone()))),
            }
        }
        headers
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Maps a non-2xx response to the error taxonomy. 429 is checked before
/// 401/403, which are checked before everything else.
pub fn classify_failure(
    status: StatusCode,
    retry_after: Option<&str>,
    body: &[u8],
    config: &EngineConfig,
) -> ApiError {
    let code = status.as_u16();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let wait = retry_after
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(config.retry_after_default_secs);
        return ApiError::rate_limit(wait);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ApiError::authentication(AUTHENTICATION_FAILED_MESSAGE, Some(code));
    }
    let message = extract_error_message(body).unwrap_or_else(|| format!("API error: {}", code));
    let retryable = config.retry_5xx && status.is_server_error();
    ApiError::generic(message, code, retryable)
}

fn extract_error_message(body: &[u8]) -> Option<String> {
    let parsed: Value = serde_json::from_slice(body).ok()?;
    ["message", "id"]
        .iter()
        .filter_map(|key| parsed.get(*key))
        .find_map(|value| match value {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            _ => None,
        })
        .map(|text| truncate_utf8_prefix(&text, limits::ERROR_BODY_PREVIEW_BYTES))
}

async fn decode_success(response: Response) -> Result<ApiPayload, ApiError> {
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(ApiPayload::Empty);
    }
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("application/json") || ct.contains("+json")
        })
        .unwrap_or(false);
    let text = response.text().await.map_err(map_reqwest_error)?;
    if is_json {
        if text.trim().is_empty() {
            return Ok(ApiPayload::Empty);
        }
        let parsed = serde_json::from_str::<Value>(&text)
            .map_err(|err| ApiError::transport(format!("response decode failed: {}", err)))?;
        return Ok(ApiPayload::Json(parsed));
    }
    Ok(ApiPayload::Text(text))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::transport(format!("request timed out: {}", err));
    }
    if err.is_connect() {
        return ApiError::transport(format!("connection failed: {}", err));
    }
    if err.is_body() || err.is_decode() {
        return ApiError::transport(format!("failed to read response body: {}", err));
    }
    ApiError::transport(format!("HTTP transport error: {}", err))
}
