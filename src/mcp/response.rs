use crate::errors::{ApiError, ApiErrorKind, CallError, ToolError};
use serde_json::{json, Map, Value};

pub fn success_result(text: String) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }]
    })
}

pub fn error_result(error: &CallError) -> Value {
    let (text, details) = match error {
        CallError::Api(err) => (api_error_text(err), api_error_details(err)),
        CallError::Tool(err) => (tool_error_text(err), tool_error_details(err)),
    };
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": true,
        "structuredContent": { "error": details }
    })
}

fn api_error_text(err: &ApiError) -> String {
    let mut text = format!("Error: {}", err.message);
    match (err.kind, err.retry_after_seconds) {
        (ApiErrorKind::RateLimit, Some(seconds)) => {
            text.push_str(&format!(" (retryable: wait {} seconds before retrying)", seconds));
        }
        (ApiErrorKind::Generic, _) | (ApiErrorKind::Transport, _) if err.retryable => {
            text.push_str(" (retryable: this request may succeed if retried)");
        }
        _ => {}
    }
    text
}

fn api_error_details(err: &ApiError) -> Value {
    json!({
        "kind": err.kind.as_str(),
        "message": err.message,
        "http_status": err.http_status,
        "retryable": err.retryable,
        "retry_after_seconds": err.retry_after_seconds,
    })
}

fn tool_error_text(err: &ToolError) -> String {
    match &err.hint {
        Some(hint) => format!("Error: {}\nHint: {}", err.message, hint),
        None => format!("Error: {}", err.message),
    }
}

fn tool_error_details(err: &ToolError) -> Value {
    let mut details = Map::new();
    details.insert("kind".to_string(), json!(err.kind));
    details.insert("code".to_string(), Value::from(err.code.clone()));
    details.insert("message".to_string(), Value::from(err.message.clone()));
    details.insert("retryable".to_string(), Value::Bool(false));
    if let Some(hint) = &err.hint {
        details.insert("hint".to_string(), Value::from(hint.clone()));
    }
    if let Some(extra) = &err.details {
        details.insert("details".to_string(), extra.clone());
    }
    Value::Object(details)
}
