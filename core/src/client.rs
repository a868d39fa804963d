use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use tracing::{debug, trace, warn};

use crate::config::ChatConfig;
use crate::errors::{ChatError, ChatResult};
use crate::frame::{Frame, FrameDecoder, ERROR_TAG};
use crate::types::{ChatMessage, CompletionRequest, GenerationConfig};

/// Raw response body, delivered chunk by chunk as it arrives
pub type ByteStream = BoxStream<'static, ChatResult<Bytes>>;

/// The model completion service: one message history in, one streamed body out
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Opens one streaming request. Non-success statuses fail here, before any body is read.
    async fn open_stream(&self, history: &[ChatMessage]) -> ChatResult<ByteStream>;
}

/// Completion service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpCompletionService {
    client: Client,
    endpoint: String,
    generation: GenerationConfig,
}

impl HttpCompletionService {
    pub fn new(config: &ChatConfig) -> ChatResult<Self> {
        let endpoint = config.endpoint().to_string();
        reqwest::Url::parse(&endpoint).map_err(|e| {
            ChatError::ConfigError(format!("Invalid endpoint '{}': {}", endpoint, e))
        })?;

        let client = Client::builder()
            .build()
            .map_err(|e| ChatError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            generation: config.generation_config(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn open_stream(&self, history: &[ChatMessage]) -> ChatResult<ByteStream> {
        let request = CompletionRequest {
            messages: history,
            generation: self.generation,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // The status is reported even when the error body cannot be read.
            let error_body = response.text().await.unwrap_or_default();

            return Err(ChatError::Status {
                status_code: status.as_u16(),
                message: format!("Completion request failed: {}", error_body),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| {
                    ChatError::Transport(format!("Failed to read response stream: {}", e))
                })
            })
            .boxed())
    }
}

/// Streams one answer and reports the growing text after every delta
#[derive(Debug, Clone)]
pub struct CompletionStreamClient<S> {
    service: S,
}

impl<S: CompletionService> CompletionStreamClient<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Sends `history` and calls `on_update` with the full answer so far after each text delta.
    ///
    /// Returns the final answer. On failure, text already passed to `on_update` stays
    /// delivered. An error returned by `on_update` stops the stream and is returned as-is.
    pub async fn open<F>(&self, history: &[ChatMessage], mut on_update: F) -> ChatResult<String>
    where
        F: FnMut(&str) -> ChatResult<()>,
    {
        // The body stream is dropped, and its connection released, on every return path.
        let mut stream = self.service.open_stream(history).await?;
        let mut decoder = FrameDecoder::new();
        let mut cumulative = String::new();
        let mut frames_seen = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            decoder.push(&chunk);
            while let Some(frame) = decoder.next_frame()? {
                frames_seen += 1;
                apply_frame(frame, &mut cumulative, &mut on_update)?;
            }
        }
        if let Some(frame) = decoder.finish()? {
            frames_seen += 1;
            apply_frame(frame, &mut cumulative, &mut on_update)?;
        }

        debug!(frames = frames_seen, chars = cumulative.chars().count(), "Stream finished");
        Ok(cumulative)
    }
}

fn apply_frame<F>(frame: Frame, cumulative: &mut String, on_update: &mut F) -> ChatResult<()>
where
    F: FnMut(&str) -> ChatResult<()>,
{
    match frame {
        Frame::TextDelta(delta) => {
            cumulative.push_str(&delta);
            on_update(cumulative)
        }
        Frame::Other { tag, payload } if tag == ERROR_TAG => {
            warn!(payload = %payload, "Completion service reported an error frame");
            Ok(())
        }
        Frame::Other { tag, .. } => {
            trace!(tag = %tag, "Ignoring metadata frame");
            Ok(())
        }
    }
}
