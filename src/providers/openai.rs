//! OpenAI provider.
//!
//! Speaks the chat-completions protocol: Bearer auth, `messages[]` request
//! body, SSE streaming with `data:`-prefixed JSON lines terminated by a
//! `[DONE]` sentinel.

use std::pin::Pin;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::credentials::CredentialStore;
use crate::providers::framing::{self, SseFramer};
use crate::providers::{
    AdapterRequest, CodegenProvider, DeltaStream, ProviderError, ProviderKind, StreamDelta,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_TOKENS: u32 = 8_192;
const DEFAULT_TEMPERATURE: f32 = 0.7;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: WireDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Adapter for the OpenAI chat-completions API.
pub struct OpenAiProvider {
    http: Client,
    credentials: Arc<CredentialStore>,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self::with_base_url(credentials, DEFAULT_API_BASE)
    }

    /// Point the adapter at a non-default endpoint (proxies, test servers).
    pub fn with_base_url(credentials: Arc<CredentialStore>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            credentials,
            base_url: base_url.into(),
        }
    }

    fn api_key(&self) -> Result<String, ProviderError> {
        self.credentials
            .get(ProviderKind::OpenAi)?
            .ok_or(ProviderError::MissingKey(ProviderKind::OpenAi))
    }

    fn build_body(request: &AdapterRequest, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: vec![
                WireMessage {
                    role: "system",
                    content: request.system_prompt.clone(),
                },
                WireMessage {
                    role: "user",
                    content: request.prompt.clone(),
                },
            ],
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stream,
        }
    }

    /// Interpret one SSE frame payload. `None` means the frame does not
    /// match the vendor shape and is skipped.
    fn parse_chunk(data: &str) -> Option<StreamDelta> {
        let chunk: StreamChunk = serde_json::from_str(data).ok()?;

        if let Some(err) = chunk.error {
            return Some(StreamDelta {
                error: Some(err.message),
                ..StreamDelta::default()
            });
        }

        let mut delta = StreamDelta::default();
        if let Some(choice) = chunk.choices.first() {
            if let Some(text) = &choice.delta.content {
                delta.text = text.clone();
            }
            if choice.finish_reason.is_some() {
                delta.done = true;
            }
        }
        Some(delta)
    }

    async fn send_request(
        &self,
        request: &AdapterRequest,
        stream: bool,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, ProviderError> {
        let key = self.api_key()?;
        let body = Self::build_body(request, stream);

        let send = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&key)
            .header("content-type", "application/json")
            .json(&body)
            .send();

        let resp = tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            result = send => result?,
        };

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(resp)
    }
}

impl CodegenProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn display_name(&self) -> &str {
        "OpenAI"
    }

    fn generate(
        &self,
        request: &AdapterRequest,
        cancel: &CancellationToken,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, ProviderError>> + Send + '_>> {
        let request = request.clone();
        let cancel = cancel.clone();
        Box::pin(async move {
            let resp = self.send_request(&request, false, &cancel).await?;
            let api: ChatCompletionResponse = resp.json().await?;
            Ok(api
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default())
        })
    }

    fn stream(
        &self,
        request: &AdapterRequest,
        cancel: &CancellationToken,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<DeltaStream, ProviderError>> + Send + '_>>
    {
        let request = request.clone();
        let cancel = cancel.clone();
        Box::pin(async move {
            let resp = self.send_request(&request, true, &cancel).await?;
            Ok(framing::delta_stream(
                resp,
                SseFramer::new(),
                Self::parse_chunk,
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_without_key() -> OpenAiProvider {
        OpenAiProvider::new(Arc::new(CredentialStore::in_memory()))
    }

    fn request() -> AdapterRequest {
        AdapterRequest {
            model: "gpt-4o".into(),
            prompt: "build a widget".into(),
            system_prompt: "you are helpful".into(),
            temperature: None,
            max_tokens: None,
        }
    }

    #[test]
    fn test_kind_and_name() {
        let p = provider_without_key();
        assert_eq!(p.kind(), ProviderKind::OpenAi);
        assert_eq!(p.display_name(), "OpenAI");
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_fast() {
        let p = provider_without_key();
        let result = p.generate(&request(), &CancellationToken::new()).await;
        assert!(matches!(result, Err(ProviderError::MissingKey(ProviderKind::OpenAi))));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let store = CredentialStore::in_memory();
        store.set(ProviderKind::OpenAi, "sk-test").unwrap();
        let p = OpenAiProvider::with_base_url(Arc::new(store), "http://127.0.0.1:9");

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = p.generate(&request(), &cancel).await;
        assert!(matches!(result, Err(ProviderError::Cancelled)));
    }

    #[test]
    fn test_build_body_defaults() {
        let body = OpenAiProvider::build_body(&request(), true);
        assert_eq!(body.model, "gpt-4o");
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(body.messages[1].role, "user");
        assert_eq!(body.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(body.stream);
    }

    #[test]
    fn test_parse_chunk_text_delta() {
        let delta = OpenAiProvider::parse_chunk(
            r#"{"choices":[{"delta":{"content":"hello"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(delta.text, "hello");
        assert!(!delta.done);
        assert!(delta.error.is_none());
    }

    #[test]
    fn test_parse_chunk_finish_reason_marks_done() {
        let delta = OpenAiProvider::parse_chunk(
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert!(delta.done);
        assert!(delta.text.is_empty());
    }

    #[test]
    fn test_parse_chunk_inband_error() {
        let delta =
            OpenAiProvider::parse_chunk(r#"{"error":{"message":"quota exceeded"}}"#).unwrap();
        assert_eq!(delta.error.as_deref(), Some("quota exceeded"));
        assert!(!delta.done);
    }

    #[test]
    fn test_parse_chunk_malformed_is_skipped() {
        assert!(OpenAiProvider::parse_chunk("not json at all").is_none());
        assert!(OpenAiProvider::parse_chunk("{\"choices\":\"wrong type\"}").is_none());
    }
}
