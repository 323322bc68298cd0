//! Wire decoding shared by complete responses and streamed chunks.
//!
//! Every field the vendor may omit is an `Option` here; the projections
//! below apply the defaults in one place so `message` and `delta` objects
//! decode by the same rules.

use super::response::{ChatCompletion, ChatCompletionMessage, Choice};
use super::stream::{ChatCompletionChunk, ChunkChoice, Delta, PartialFunction, PartialToolCall};
use crate::provider::types::{
    FUNCTION_TYPE, FinishReason, FunctionCall, Role, ToolCall, Usage, lenient_timestamp,
};
use serde::Deserialize;

pub(crate) const COMPLETION_OBJECT: &str = "chat.completion";
pub(crate) const CHUNK_OBJECT: &str = "chat.completion.chunk";

/// Top-level object shared by `chat.completion` and `chat.completion.chunk`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireEnvelope {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created: Option<u64>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<WireChoice>,
    /// Decoded separately so a malformed usage object cannot reject the frame.
    #[serde(default)]
    pub usage: Option<serde_json::Value>,
}

impl WireEnvelope {
    fn usage(&mut self) -> Option<Usage> {
        let value = self.usage.take()?;
        match serde_json::from_value(value) {
            Ok(usage) => Some(usage),
            Err(e) => {
                tracing::debug!("Ignoring unreadable usage: {e}");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChoice {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub message: Option<WireMessage>,
    #[serde(default)]
    pub delta: Option<WireMessage>,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireMessage {
    /// Kept as text; names outside [`Role`] are treated as absent.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    /// Alternative reasoning field (some upstream models).
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

impl WireMessage {
    fn take_reasoning(&mut self) -> Option<String> {
        self.reasoning_content.take().or_else(|| self.reasoning.take())
    }

    fn role(&self) -> Option<Role> {
        let name = self.role.as_deref()?;
        let role = Role::from_wire(name);
        if role.is_none() {
            tracing::debug!(role = name, "Unknown role");
        }
        role
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireToolCall {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub call_type: Option<String>,
    #[serde(default)]
    pub function: Option<WireFunction>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireFunction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Choice index defaults to its position in the array.
fn choice_index(index: Option<u32>, position: usize) -> u32 {
    index.unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX))
}

pub(crate) fn into_completion(mut wire: WireEnvelope) -> ChatCompletion {
    let usage = wire.usage();
    let choices = wire
        .choices
        .into_iter()
        .enumerate()
        .map(|(position, choice)| Choice {
            index: choice_index(choice.index, position),
            message: into_message(choice.message.or(choice.delta).unwrap_or_default()),
            finish_reason: choice.finish_reason,
        })
        .collect();

    ChatCompletion {
        id: wire.id.unwrap_or_default(),
        object: wire.object.unwrap_or_else(|| COMPLETION_OBJECT.to_string()),
        created: wire.created.unwrap_or_default(),
        model: wire.model.unwrap_or_default(),
        choices,
        usage,
    }
}

pub(crate) fn into_chunk(mut wire: WireEnvelope) -> ChatCompletionChunk {
    let usage = wire.usage();
    let choices = wire
        .choices
        .into_iter()
        .enumerate()
        .map(|(position, choice)| ChunkChoice {
            index: choice_index(choice.index, position),
            delta: into_delta(choice.delta.or(choice.message).unwrap_or_default()),
            finish_reason: choice.finish_reason,
        })
        .collect();

    ChatCompletionChunk {
        id: wire.id.unwrap_or_default(),
        object: wire.object.unwrap_or_else(|| CHUNK_OBJECT.to_string()),
        created: wire.created.unwrap_or_default(),
        model: wire.model.unwrap_or_default(),
        choices,
        usage,
    }
}

fn into_message(mut wire: WireMessage) -> ChatCompletionMessage {
    let reasoning_content = wire.take_reasoning();
    ChatCompletionMessage {
        role: wire.role().unwrap_or_default(),
        content: wire.content,
        reasoning_content,
        tool_calls: wire
            .tool_calls
            .map(|calls| calls.into_iter().map(into_tool_call).collect()),
    }
}

fn into_delta(mut wire: WireMessage) -> Delta {
    let reasoning_content = wire.take_reasoning();
    Delta {
        role: wire.role(),
        content: wire.content,
        reasoning_content,
        tool_calls: wire
            .tool_calls
            .map(|calls| calls.into_iter().map(into_partial_tool_call).collect()),
    }
}

fn into_tool_call(wire: WireToolCall) -> ToolCall {
    let function = wire.function.unwrap_or_default();
    ToolCall {
        id: wire.id.unwrap_or_default(),
        call_type: wire.call_type.unwrap_or_else(|| FUNCTION_TYPE.to_string()),
        function: FunctionCall {
            name: function.name.unwrap_or_default(),
            arguments: function.arguments.unwrap_or_default(),
        },
    }
}

fn into_partial_tool_call(wire: WireToolCall) -> PartialToolCall {
    PartialToolCall {
        index: wire.index.unwrap_or(0),
        id: wire.id,
        call_type: wire.call_type,
        function: wire.function.map(|f| PartialFunction {
            name: f.name,
            arguments: f.arguments,
        }),
    }
}
