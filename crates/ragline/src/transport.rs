//! The two ways an exchange reaches the retrieval backend: a live
//! newline-delimited byte stream, and a single-shot JSON request/response
//! pair used as the fallback.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::SurfaceConfig;
use crate::error::ChatError;
use crate::message::Citation;

/// Request body shared by both transports; the non-streaming path sets
/// `stream: false`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
    pub include_vector: bool,
    pub include_sparse: bool,
    pub include_graph: bool,
    pub recall_intensity: u8,
    pub stream: bool,
}

impl ChatRequest {
    /// Builds a request for one user message from the surface configuration.
    pub fn new(config: &SurfaceConfig, conversation_id: Option<String>, message: &str) -> Self {
        Self {
            message: message.to_string(),
            sources: config.sources.clone(),
            conversation_id,
            model_override: config.model_override.clone(),
            include_vector: config.include_vector,
            include_sparse: config.include_sparse,
            include_graph: config.include_graph,
            recall_intensity: config.recall_intensity,
            stream: true,
        }
    }

    pub fn non_streaming(mut self) -> Self {
        self.stream = false;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: String,
}

/// The single JSON object returned by the non-streaming transport.
#[derive(Debug, Deserialize)]
pub struct ChatResponseBody {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub message: ResponseMessage,
    #[serde(default)]
    pub sources: Vec<Citation>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub started_at_ms: Option<i64>,
    #[serde(default)]
    pub ended_at_ms: Option<i64>,
    #[serde(default)]
    pub debug: Option<Value>,
}

/// A live response body: raw bytes in whatever chunking the network gives us.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

/// The seam between the session controller and the backend.
///
/// Implementations must report non-2xx statuses as errors before yielding a
/// stream, so that "the response has begun" is an honest signal.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Issues a streaming exchange and returns the live response body.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatError>;

    /// Issues a single-shot exchange and returns the parsed response.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponseBody, ChatError>;
}

/// Production transport speaking to the backend over HTTP.
pub struct HttpChatTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpChatTransport {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    async fn post(&self, path: &str, request: &ChatRequest) -> Result<reqwest::Response, ChatError> {
        let url = self.base_url.join(path)?;
        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "could not read body".to_string());
            return Err(ChatError::Http(format!("HTTP {}: {}", status, body)));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let response = self.post("chat/stream", request).await?;
        Ok(Box::pin(
            response.bytes_stream().map(|item| item.map_err(ChatError::from)),
        ))
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponseBody, ChatError> {
        let response = self.post("chat", request).await?;
        let raw = response.text().await?;
        serde_json::from_str(&raw).map_err(|e| ChatError::ResponseFormat {
            message: format!("Failed to decode chat response: {}", e),
            raw_response: raw,
        })
    }
}
