//! Shared OpenAI-compatible types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Default `type` of a tool call.
pub const FUNCTION_TYPE: &str = "function";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    #[default]
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl Role {
    /// Map a wire role name. Names outside the OpenAI set return `None`.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why generation stopped for a choice.
///
/// Vendors occasionally report values outside the OpenAI set; those decode
/// as [`FinishReason::Other`] instead of failing the whole payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    #[serde(other)]
    Other,
}

impl FinishReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::ContentFilter => "content_filter",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: FUNCTION_TYPE.to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Decode the JSON-encoded `arguments` string.
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.function.arguments)
    }
}

/// Function name and JSON-encoded arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[allow(clippy::struct_field_names)] // Field names match API response
pub struct Usage {
    #[serde(default, deserialize_with = "lenient_count")]
    pub prompt_tokens: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub completion_tokens: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_tokens: u32,
}

/// Non-negative integer from any JSON number; floats are truncated.
pub(crate) fn number_as_u64(value: &serde_json::Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.trunc() as u64)
    })
}

/// Token counter that tolerates `null`, floats and other junk (read as 0).
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_as_u64)
        .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX)))
}

/// Optional timestamp that accepts floats and ignores non-numbers.
pub(crate) fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_as_u64))
}

/// In-progress tool call assembled from streamed fragments.
#[derive(Debug, Default, Clone)]
pub struct ToolBuilder {
    pub id: Option<String>,
    pub call_type: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

impl ToolBuilder {
    /// Append an arguments fragment verbatim.
    pub fn push(&mut self, fragment: &str) {
        self.arguments.push_str(fragment);
    }

    /// Materialize the tool call. Fields never seen default to empty.
    pub fn finish(self) -> ToolCall {
        ToolCall {
            id: self.id.unwrap_or_default(),
            call_type: self
                .call_type
                .unwrap_or_else(|| FUNCTION_TYPE.to_string()),
            function: FunctionCall {
                name: self.name.unwrap_or_default(),
                arguments: self.arguments,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_wire_names() {
        let reason: FinishReason = serde_json::from_str("\"tool_calls\"").unwrap();
        assert_eq!(reason, FinishReason::ToolCalls);
        let reason: FinishReason = serde_json::from_str("\"content_filter\"").unwrap();
        assert_eq!(reason, FinishReason::ContentFilter);
        assert_eq!(serde_json::to_string(&FinishReason::Length).unwrap(), "\"length\"");
    }

    #[test]
    fn test_unknown_finish_reason() {
        let reason: FinishReason = serde_json::from_str("\"function_call\"").unwrap();
        assert_eq!(reason, FinishReason::Other);
    }

    #[test]
    fn test_tool_call_type_field() {
        let call = ToolCall::new("call_1", "get_weather", "{}");
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "get_weather");
    }

    #[test]
    fn test_parse_arguments() {
        let call = ToolCall::new("call_1", "get_weather", r#"{"location":"NYC"}"#);
        let args: serde_json::Value = call.parse_arguments().unwrap();
        assert_eq!(args["location"], "NYC");

        let broken = ToolCall::new("call_2", "get_weather", r#"{"location":"#);
        assert!(broken.parse_arguments::<serde_json::Value>().is_err());
    }

    #[test]
    fn test_usage_tolerates_null_and_floats() {
        let usage: Usage = serde_json::from_str(
            r#"{"prompt_tokens":null,"completion_tokens":12.0,"total_tokens":"n/a"}"#,
        )
        .unwrap();
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.completion_tokens, 12);
        assert_eq!(usage.total_tokens, 0);
    }

    #[test]
    fn test_number_as_u64() {
        assert_eq!(number_as_u64(&serde_json::json!(1_700_000_000)), Some(1_700_000_000));
        assert_eq!(number_as_u64(&serde_json::json!(1_700_000_000.75)), Some(1_700_000_000));
        assert_eq!(number_as_u64(&serde_json::json!(-3)), None);
        assert_eq!(number_as_u64(&serde_json::json!("12")), None);
    }

    #[test]
    fn test_role_from_wire() {
        assert_eq!(Role::from_wire("tool"), Some(Role::Tool));
        assert_eq!(Role::from_wire("developer"), None);
    }

    #[test]
    fn test_builder_defaults() {
        let mut builder = ToolBuilder::default();
        builder.push("{\"a\":");
        builder.push("1}");
        let call = builder.finish();
        assert_eq!(call.id, "");
        assert_eq!(call.call_type, "function");
        assert_eq!(call.function.arguments, "{\"a\":1}");
    }
}
