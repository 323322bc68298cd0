//! HTTP transport for the chat completions endpoint.

mod client;
mod lines;

pub use client::{GEN_CHAT_URL, HttpClient, PUBLIC_CHAT_URL};
pub use lines::{LineDecoder, line_stream};
