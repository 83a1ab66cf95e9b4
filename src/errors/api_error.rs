use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    Authentication,
    RateLimit,
    Generic,
    Transport,
}

impl ApiErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiErrorKind::Authentication => "authentication",
            ApiErrorKind::RateLimit => "rate_limit",
            ApiErrorKind::Generic => "generic",
            ApiErrorKind::Transport => "transport",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

pub const AUTHENTICATION_FAILED_MESSAGE: &str =
    "Authentication failed: the API token is missing, invalid, or lacks the required scope";

impl ApiError {
    pub fn authentication(message: impl Into<String>, http_status: Option<u16>) -> Self {
        Self {
            kind: ApiErrorKind::Authentication,
            message: message.into(),
            http_status,
            retryable: false,
            retry_after_seconds: None,
        }
    }

    pub fn missing_token() -> Self {
        Self::authentication(
            "Missing API token: supply it via the X-DigitalOcean-Token header (or DIGITALOCEAN_TOKEN for stdio)",
            None,
        )
    }

    pub fn rate_limit(retry_after_seconds: u64) -> Self {
        Self {
            kind: ApiErrorKind::RateLimit,
            message: format!(
                "Rate limit exceeded, retry after {} seconds",
                retry_after_seconds
            ),
            http_status: Some(429),
            retryable: true,
            retry_after_seconds: Some(retry_after_seconds),
        }
    }

    pub fn generic(message: impl Into<String>, http_status: u16, retryable: bool) -> Self {
        Self {
            kind: ApiErrorKind::Generic,
            message: message.into(),
            http_status: Some(http_status),
            retryable,
            retry_after_seconds: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Transport,
            message: message.into(),
            http_status: None,
            retryable: true,
            retry_after_seconds: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_retryable_and_carries_hint() {
        let err = ApiError::rate_limit(120);
        assert_eq!(err.kind, ApiErrorKind::RateLimit);
        assert!(err.retryable);
        assert_eq!(err.retry_after_seconds, Some(120));
        assert_eq!(err.http_status, Some(429));
    }

    #[test]
    fn authentication_is_never_retryable() {
        let err = ApiError::authentication(AUTHENTICATION_FAILED_MESSAGE, Some(401));
        assert!(!err.retryable);
        assert!(err.retry_after_seconds.is_none());
        assert_eq!(err.kind, ApiErrorKind::Authentication);
    }

    #[test]
    fn serialized_form_omits_absent_fields() {
        let err = ApiError::transport("connection failed: refused");
        let value = serde_json::to_value(&err).expect("serialize");
        assert_eq!(value["kind"], "transport");
        assert!(value.get("http_status").is_none());
        assert!(value.get("retry_after_seconds").is_none());
    }
}
