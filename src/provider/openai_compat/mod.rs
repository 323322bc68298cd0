//! OpenAI-compatible chat completions: object model, parsing and streaming.

mod client;
mod convert;
mod request;
mod response;
mod stream;
mod stream_handler;


pub use client::OpenAICompatClient;
pub use request::{
    ChatCompletionRequest, DEFAULT_MODEL, FunctionDefinition, ReasoningEffort, RequestMessage,
    ResponseFormat, Tool, ToolChoice,
};
pub use response::{ChatCompletion, ChatCompletionMessage, Choice, parse};
pub use stream::{ChatCompletionChunk, ChunkChoice, Delta, PartialFunction, PartialToolCall};
pub use stream_handler::{
    ChunkStream, CompletionAccumulator, DATA_PREFIX, DONE_MARKER, LineStream, collect_full, stream,
};
