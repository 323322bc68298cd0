//! HTTP client for the chat completions endpoint.

use super::lines::line_stream;
use crate::config::Config;
use crate::provider::client::ChatTransport;
use crate::provider::error::{Error, format_api_error};
use crate::provider::openai_compat::LineStream;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use std::time::Duration;

/// Public OpenAI-compatible endpoint (no key).
pub const PUBLIC_CHAT_URL: &str = "https://text.pollinations.ai/openai";
/// Keyed OpenAI-compatible endpoint.
pub const GEN_CHAT_URL: &str = "https://gen.pollinations.ai/v1/chat/completions";

/// Connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for chat completion requests.
pub struct HttpClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// `read_timeout` bounds each socket read, not the whole request.
    pub fn new(url: impl Into<String>, api_key: Option<String>, read_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .read_timeout(read_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Build a client from configuration.
    ///
    /// Without an explicit `chat_url`, a configured API key selects the keyed
    /// endpoint and its absence selects the public one.
    pub fn from_config(config: &Config) -> Self {
        let url = config.chat_url.clone().unwrap_or_else(|| {
            if config.api_key.is_some() {
                GEN_CHAT_URL.to_string()
            } else {
                PUBLIC_CHAT_URL.to_string()
            }
        });
        Self::new(url, config.api_key.clone(), config.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build headers including the bearer token when one is configured.
    fn build_headers(&self, streaming: bool) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if streaming {
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        }

        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| Error::Api("API key contains invalid header characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Send the payload and map non-success statuses to errors.
    async fn send(
        &self,
        payload: &serde_json::Value,
        streaming: bool,
    ) -> Result<reqwest::Response, Error> {
        let headers = self.build_headers(streaming)?;

        tracing::debug!(url = %self.url, streaming, "Chat completion request");

        let response = self
            .client
            .post(&self.url)
            .headers(headers)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(&response);
            return Err(Error::RateLimited { retry_after });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Api(format_api_error(&format!("HTTP {status}: {text}"))));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatTransport for HttpClient {
    async fn post_chat(&self, payload: &serde_json::Value) -> Result<String, Error> {
        let response = self.send(payload, false).await?;
        Ok(response.text().await?)
    }

    async fn post_chat_stream(&self, payload: &serde_json::Value) -> Result<LineStream, Error> {
        let response = self.send(payload, true).await?;
        Ok(line_stream(response.bytes_stream()))
    }
}

/// Extract and parse `Retry-After` header from a response.
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    let value = response.headers().get(RETRY_AFTER)?;
    parse_retry_after_value(value.to_str().ok()?)
}

/// Parse a `Retry-After` header value as seconds.
///
/// Handles integer and fractional seconds (rounds up). HTTP-date values and
/// non-finite numbers return None.
fn parse_retry_after_value(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        Some(secs.max(1))
    } else if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() && f > 0.0 {
            Some((f.ceil() as u64).max(1))
        } else {
            None
        }
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::openai_compat;
    use futures::StreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one HTTP request (headers plus `Content-Length` body).
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }

    /// Serve the given response parts to every connection, pausing between parts.
    async fn serve(parts: Vec<&'static str>, pause: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let parts = parts.clone();
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    for (i, part) in parts.iter().enumerate() {
                        if i > 0 {
                            tokio::time::sleep(pause).await;
                        }
                        socket.write_all(part.as_bytes()).await.unwrap();
                        socket.flush().await.unwrap();
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}/v1/chat/completions")
    }

    fn client(url: String) -> HttpClient {
        HttpClient::new(url, None, Duration::from_secs(5))
    }

    const RATE_LIMITED: &str = "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 7\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

    const SERVER_ERROR: &str = "HTTP/1.1 500 Internal Server Error\r\nContent-Type: application/json\r\nContent-Length: 40\r\nConnection: close\r\n\r\n{\"error\":{\"message\":\"Model overloaded\"}}";

    #[tokio::test]
    async fn test_rate_limited_status() {
        let client = client(serve(vec![RATE_LIMITED], Duration::ZERO).await);
        let payload = serde_json::json!({"messages": []});

        let err = client.post_chat(&payload).await.unwrap_err();
        assert!(matches!(err, Error::RateLimited { retry_after: Some(7) }));

        let err = client.post_chat_stream(&payload).await.err().unwrap();
        assert!(matches!(err, Error::RateLimited { retry_after: Some(7) }));
    }

    #[tokio::test]
    async fn test_error_status_extracts_message() {
        let client = client(serve(vec![SERVER_ERROR], Duration::ZERO).await);
        let payload = serde_json::json!({"messages": []});

        match client.post_chat(&payload).await.unwrap_err() {
            Error::Api(msg) => {
                assert!(msg.contains("500"), "{msg}");
                assert!(msg.contains("Model overloaded"), "{msg}");
                assert!(!msg.contains('{'), "{msg}");
            }
            other => panic!("expected Api, got {other:?}"),
        }

        match client.post_chat_stream(&payload).await.err().unwrap() {
            Error::Api(msg) => assert!(msg.contains("Model overloaded"), "{msg}"),
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_outlives_read_timeout() {
        let parts = vec![
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"c\"}}]}\n\n",
            "data: [DONE]\n\n",
        ];
        let url = serve(parts, Duration::from_millis(150)).await;
        // Each read finishes well inside the timeout; the whole body does not.
        let client = HttpClient::new(url, None, Duration::from_millis(400));

        let lines = client
            .post_chat_stream(&serde_json::json!({"stream": true}))
            .await
            .unwrap();
        let mut chunks = openai_compat::stream(lines);
        let mut text = String::new();
        while let Some(chunk) = chunks.next().await {
            text.push_str(chunk.unwrap().content().unwrap_or_default());
        }
        assert_eq!(text, "abc");
        assert!(chunks.is_done());
    }

    #[tokio::test]
    async fn test_post_chat_returns_body() {
        let response = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 14\r\nConnection: close\r\n\r\n{\"choices\":[]}";
        let client = client(serve(vec![response], Duration::ZERO).await);
        let body = client.post_chat(&serde_json::json!({})).await.unwrap();
        assert_eq!(body, "{\"choices\":[]}");
    }

    #[test]
    fn test_public_endpoint_without_key() {
        let client = HttpClient::from_config(&Config::default());
        assert_eq!(client.url(), PUBLIC_CHAT_URL);
        let headers = client.build_headers(false).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
        assert!(headers.get(ACCEPT).is_none());
    }

    #[test]
    fn test_keyed_endpoint_and_bearer() {
        let config = Config {
            api_key: Some("test-token".into()),
            ..Config::default()
        };
        let client = HttpClient::from_config(&config);
        assert_eq!(client.url(), GEN_CHAT_URL);
        let headers = client.build_headers(true).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer test-token");
        assert_eq!(headers.get(ACCEPT).unwrap(), "text/event-stream");
    }

    #[test]
    fn test_explicit_url_wins() {
        let config = Config {
            api_key: Some("k".into()),
            chat_url: Some("http://localhost:8080/v1/chat/completions".into()),
            ..Config::default()
        };
        let client = HttpClient::from_config(&config);
        assert_eq!(client.url(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = HttpClient::new(PUBLIC_CHAT_URL, Some("secret".into()), Duration::from_secs(5));
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after_value("30"), Some(30));
        assert_eq!(parse_retry_after_value("0"), Some(1));
        assert_eq!(parse_retry_after_value("2.5"), Some(3));
        assert_eq!(parse_retry_after_value("  30  "), Some(30));
        assert_eq!(parse_retry_after_value("Thu, 01 Jan 2026 00:00:00 GMT"), None);
        assert_eq!(parse_retry_after_value("-1.5"), None);
        assert_eq!(parse_retry_after_value("NaN"), None);
    }
}
