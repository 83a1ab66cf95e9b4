use crate::constants::provider::{BASE_URL_ENV_KEY, BASE_URL_HEADER, TOKEN_ENV_KEYS, TOKEN_HEADER};
use crate::errors::ApiError;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct TenantCredentials {
    pub token: String,
    pub base_url: Option<String>,
}

impl TenantCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn resolve_base_url<'a>(&'a self, default_base_url: &'a str) -> &'a str {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .unwrap_or(default_base_url)
    }
}

impl fmt::Debug for TenantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantCredentials")
            .field("token", &"[redacted]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn resolve_from_headers(headers: &HeaderMap) -> Result<TenantCredentials, ApiError> {
    let token = header_text(headers, TOKEN_HEADER).ok_or_else(ApiError::missing_token)?;
    let mut credentials = TenantCredentials::new(token);
    if let Some(base_url) = header_text(headers, BASE_URL_HEADER) {
        credentials = credentials.with_base_url(base_url);
    }
    Ok(credentials)
}

pub fn headers_from_env() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let token = TOKEN_ENV_KEYS
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty());
    if let Some(token) = token {
        insert_header(&mut headers, TOKEN_HEADER, &token);
    }
    if let Ok(base_url) = std::env::var(BASE_URL_ENV_KEY) {
        insert_header(&mut headers, BASE_URL_HEADER, base_url.trim());
    }
    headers
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}
