//! OpenAI-compatible chat completions client.

use super::request::ChatCompletionRequest;
use super::response::{self, ChatCompletion};
use super::stream_handler::ChunkStream;
use crate::config::Config;
use crate::provider::client::ChatTransport;
use crate::provider::error::Error;
use crate::provider::http::HttpClient;

/// Chat completions client over any [`ChatTransport`].
#[derive(Debug)]
pub struct OpenAICompatClient<T = HttpClient> {
    transport: T,
}

impl OpenAICompatClient<HttpClient> {
    /// Create a client that talks HTTP using the given configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::with_transport(HttpClient::from_config(config))
    }
}

impl<T: ChatTransport> OpenAICompatClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Make a non-streaming chat completion request.
    pub async fn create(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion, Error> {
        let payload = payload(request, false)?;

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Chat completion request"
        );

        let body = self.transport.post_chat(&payload).await?;
        response::parse(&body)
    }

    /// Stream a chat completion request.
    ///
    /// Chunks are decoded lazily as the returned stream is polled.
    pub async fn create_stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream, Error> {
        let payload = payload(request, true)?;

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Chat completion stream request"
        );

        let lines = self.transport.post_chat_stream(&payload).await?;
        Ok(ChunkStream::new(lines))
    }

    /// Stream a request and merge every chunk into one completion.
    pub async fn create_collected(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletion, Error> {
        self.create_stream(request).await?.collect_full().await
    }
}

fn payload(request: &ChatCompletionRequest, stream: bool) -> Result<serde_json::Value, Error> {
    Ok(request.to_payload(stream)?)
}
