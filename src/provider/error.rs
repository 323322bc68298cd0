//! Provider error types.

use thiserror::Error;

/// Format an API error for display, extracting message from JSON if present.
///
/// Handles common patterns:
/// - `"HTTP 403: {"error": {"message": "..."}}"` → extracts message
/// - `"HTTP 429: {"error": {"message": "Rate limit"}}"` → extracts message
/// - Plain text errors → returns as-is
#[must_use]
pub fn format_api_error(error: &str) -> String {
    if let Some(json_start) = error.find('{') {
        let json_str = &error[json_start..];

        if let Ok(json) = serde_json::from_str::<serde_json::Value>(json_str)
            && let Some(msg) = extract_error_message(&json)
        {
            let prefix = error[..json_start].trim();
            if prefix.is_empty() {
                return msg;
            }
            return format!("{prefix} {msg}");
        }
    }

    error.to_string()
}

/// Extract user-friendly message from JSON error response.
fn extract_error_message(json: &serde_json::Value) -> Option<String> {
    // {"error": {"message": "...", "code": "..."}}
    // {"error": "..."}
    // {"message": "..."}
    if let Some(error_obj) = json.get("error") {
        if let Some(msg) = error_obj.get("message").and_then(|v| v.as_str()) {
            if let Some(code) = error_obj.get("code").and_then(|v| v.as_str()) {
                return Some(format!("{msg} (code: {code})"));
            }
            return Some(msg.to_string());
        }

        if let Some(msg) = error_obj.as_str() {
            return Some(msg.to_string());
        }
    }

    json.get("message")
        .and_then(|v| v.as_str())
        .map(String::from)
}

#[derive(Debug, Error)]
pub enum Error {
    /// A non-streaming body did not match the chat-completion shape.
    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// One streamed frame was not valid JSON or lacked `choices`.
    #[error("Malformed chunk ({reason}): {line}")]
    MalformedChunk { line: String, reason: String },

    /// The transport ended or failed before `data: [DONE]`.
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("API error: {0}")]
    Api(String),

    /// The request could not be serialized before sending.
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },
}

impl Error {
    /// True for errors raised by the wire protocol itself rather than the transport.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::MalformedResponse { .. } | Self::MalformedChunk { .. }
        )
    }
}
