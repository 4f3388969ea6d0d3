//! Error types for auth endpoint calls and credential storage

use std::collections::BTreeMap;

/// Errors from auth operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The backend answered login/register/logout with a non-2xx status.
    #[error("request rejected ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        fields: BTreeMap<String, String>,
    },

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum length of a raw body echoed into an error message
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Server-provided error details pulled out of a non-2xx JSON body.
///
/// The backend is not consistent: `message` may be a string or a list of
/// validation messages, some routes use `error` instead, and field errors
/// arrive under `errors` as either strings or lists of strings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl ErrorBody {
    /// Parse a response body. Non-JSON bodies yield an empty `ErrorBody`.
    pub fn parse(body: &str) -> Self {
        let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body)
        else {
            return Self::default();
        };

        let message = map
            .get("message")
            .and_then(flatten_text)
            .or_else(|| map.get("error").and_then(flatten_text));

        let fields = match map.get("errors") {
            Some(serde_json::Value::Object(errors)) => errors
                .iter()
                .filter_map(|(field, value)| flatten_text(value).map(|text| (field.clone(), text)))
                .collect(),
            _ => BTreeMap::new(),
        };

        Self { message, fields }
    }

    /// Server message, or a truncated copy of the raw body, or `fallback`.
    pub fn message_or(&self, body: &str, fallback: &str) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed.starts_with('{') {
            fallback.to_string()
        } else {
            truncate_body(trimmed)
        }
    }
}

/// Strings pass through, arrays of strings are joined with "; ".
fn flatten_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}

/// Truncate a response body to avoid logging excessive data
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}
