//! OpenAI-compatible chat completion response and parser.

use super::convert::{self, WireEnvelope};
use crate::provider::error::Error;
use crate::provider::types::{FinishReason, Role, ToolCall, Usage};
use serde::Serialize;

/// Response from a non-streaming chat completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    /// Message of the first choice, if any.
    pub fn message(&self) -> Option<&ChatCompletionMessage> {
        self.choices.first().map(|c| &c.message)
    }

    /// Text content of the first choice.
    pub fn content(&self) -> Option<&str> {
        self.message().and_then(|m| m.content.as_deref())
    }
}

/// A choice in the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatCompletionMessage,
    pub finish_reason: Option<FinishReason>,
}

/// Message content in a response.
///
/// Absent fields serialize as `null` so callers see the full shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatCompletionMessage {
    pub role: Role,
    pub content: Option<String>,
    /// Reasoning channel, parallel to `content`.
    pub reasoning_content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatCompletionMessage {
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}

/// Parse one complete chat-completion body.
///
/// Only `choices` is required; an empty `choices` array is returned as-is.
pub fn parse(body: &str) -> Result<ChatCompletion, Error> {
    let wire: WireEnvelope = serde_json::from_str(body).map_err(|e| {
        tracing::warn!("Malformed chat completion: {e}");
        Error::MalformedResponse {
            reason: e.to_string(),
        }
    })?;
    Ok(convert::into_completion(wire))
}
