//! OpenAI-compatible streaming chunk types.

use super::convert::{self, WireEnvelope};
use crate::provider::stream::ToolCallFragment;
use crate::provider::types::{FinishReason, Role, Usage};
use serde::Serialize;

/// Streaming chunk from OpenAI-compatible APIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletionChunk {
    /// Decode one `data:` payload.
    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        let wire: WireEnvelope = serde_json::from_str(payload)?;
        Ok(convert::into_chunk(wire))
    }

    /// Content delta of the first choice.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }

    /// First non-null finish reason carried by this chunk.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.choices.iter().find_map(|c| c.finish_reason)
    }
}

/// A choice in a streaming chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<FinishReason>,
}

/// Delta content in a streaming choice. Fields absent from the frame stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<PartialToolCall>>,
}

/// Tool call fragment; `arguments` is a substring to append.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialToolCall {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<PartialFunction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialFunction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallFragment for PartialToolCall {
    fn index(&self) -> u32 {
        self.index
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn call_type(&self) -> Option<&str> {
        self.call_type.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.function.as_ref().and_then(|f| f.name.as_deref())
    }

    fn arguments(&self) -> Option<&str> {
        self.function.as_ref().and_then(|f| f.arguments.as_deref())
    }
}
