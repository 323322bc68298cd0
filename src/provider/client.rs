//! Transport seam between the protocol core and the network.

use super::error::Error;
use super::openai_compat::LineStream;
use async_trait::async_trait;

/// Sends chat payloads and returns raw bodies or raw lines.
///
/// Implementations own timeouts and connection handling; the protocol core
/// only decodes what they return.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// POST a non-streaming request and return the full response body.
    async fn post_chat(&self, payload: &serde_json::Value) -> Result<String, Error>;

    /// POST a streaming request and return its lines in arrival order.
    ///
    /// A mid-stream `Err` item signals connection loss.
    async fn post_chat_stream(&self, payload: &serde_json::Value) -> Result<LineStream, Error>;
}
