#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cli;
pub mod config;
pub mod error;
pub mod provider;

pub use provider::{ChatCompletion, ChatCompletionChunk, ChunkStream, collect_full, parse, stream};

/// HTTP-backed chat completions client.
pub type Client = provider::OpenAICompatClient<provider::HttpClient>;
