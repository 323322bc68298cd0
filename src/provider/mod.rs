//! Chat completions provider.
//!
//! Decodes OpenAI-compatible responses and server-sent event streams from the
//! Pollinations API into a typed object model, and assembles streamed tool
//! calls into complete ones.
//!
//! # Example
//!
//! ```ignore
//! use pollinations::provider::{ChatCompletionRequest, OpenAICompatClient, RequestMessage};
//!
//! let client = OpenAICompatClient::from_config(&config);
//! let request = ChatCompletionRequest::new(vec![RequestMessage::user("Hello")]);
//! let completion = client.create(&request).await?;
//! ```

mod client;
mod error;
mod http;
mod openai_compat;
mod stream;
mod types;

pub use client::ChatTransport;
pub use error::{Error, format_api_error};
pub use http::{GEN_CHAT_URL, HttpClient, LineDecoder, PUBLIC_CHAT_URL, line_stream};
pub use openai_compat::*;
pub use stream::{ToolCallAccumulator, ToolCallFragment};
pub use types::*;
