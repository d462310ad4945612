//! `{success, data, message}` response envelope handling.

use serde_json::Value;

use super::ApiError;

const DEFAULT_FAILURE_MESSAGE: &str = "request failed";

/// Unwrap an enveloped body to its `data` member.
///
/// Bodies without a boolean `success` member are returned unchanged, so
/// endpoints that answer with a bare value work too.
pub fn unwrap_envelope(body: Value) -> Result<Value, ApiError> {
    let success = match body.get("success").and_then(Value::as_bool) {
        Some(success) => success,
        None => return Ok(body),
    };

    if success {
        return Ok(match body {
            Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
            other => other,
        });
    }

    Err(ApiError::Backend {
        message: failure_message(&body).unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
    })
}

/// Human-readable failure text from an envelope or error body, if any.
///
/// Validation failures carry their details in `data.errors`; those are
/// appended to the headline message.
pub fn failure_message(body: &Value) -> Option<String> {
    let headline = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_owned)
        .or_else(|| {
            body.pointer("/error/message")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        });

    let details: Vec<&str> = body
        .pointer("/data/errors")
        .and_then(Value::as_array)
        .map(|errors| errors.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    match (headline, details.is_empty()) {
        (Some(headline), true) => Some(headline),
        (Some(headline), false) => Some(format!("{headline}: {}", details.join("; "))),
        (None, false) => Some(details.join("; ")),
        (None, true) => None,
    }
}

/// Reply text carried by an unwrapped `/chat/send` payload.
///
/// A bare string is the reply itself; an object contributes its `content`
/// member; anything else is shown as compact JSON.
pub fn extract_reply(data: &Value) -> String {
    match data {
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("content").and_then(Value::as_str) {
            Some(content) if !content.is_empty() => content.to_string(),
            _ => data.to_string(),
        },
        other => other.to_string(),
    }
}
