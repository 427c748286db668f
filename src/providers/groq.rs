//! Groq provider.
//!
//! Groq exposes an OpenAI-compatible chat completions surface at its own
//! endpoint, so the wire shapes here mirror the OpenAI adapter. They are
//! kept separate on purpose: the two vendors drift independently.

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

const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MAX_TOKENS: u32 = 8_192;
const DEFAULT_TEMPERATURE: f32 = 0.7;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
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
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
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

/// Adapter for Groq's OpenAI-compatible chat completions API.
pub struct GroqProvider {
    http: Client,
    credentials: Arc<CredentialStore>,
    base_url: String,
}

impl GroqProvider {
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
            .get(ProviderKind::Groq)?
            .ok_or(ProviderError::MissingKey(ProviderKind::Groq))
    }

    fn build_body(request: &AdapterRequest, stream: bool) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(WireMessage {
                role: "system",
                content: request.system_prompt.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stream,
        }
    }

    /// Interpret one SSE data payload. `None` means the frame is skipped.
    fn parse_chunk(data: &str) -> Option<StreamDelta> {
        let chunk: StreamChunk = serde_json::from_str(data).ok()?;

        if let Some(err) = chunk.error {
            return Some(StreamDelta {
                error: Some(err.message),
                ..StreamDelta::default()
            });
        }

        let choice = chunk.choices.into_iter().next()?;
        let mut delta = StreamDelta::default();
        if let Some(content) = choice.delta.content {
            delta.text = content;
        }
        if choice.finish_reason.is_some() {
            delta.done = true;
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
            .header("authorization", format!("Bearer {key}"))
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

impl CodegenProvider for GroqProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    fn display_name(&self) -> &str {
        "Groq"
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
            let api: ChatResponse = resp.json().await?;
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

    fn request() -> AdapterRequest {
        AdapterRequest {
            model: "llama-3.1-70b-versatile".into(),
            prompt: "build a form".into(),
            system_prompt: String::new(),
            temperature: Some(0.2),
            max_tokens: Some(1024),
        }
    }

    #[test]
    fn test_kind_and_name() {
        let p = GroqProvider::new(Arc::new(CredentialStore::in_memory()));
        assert_eq!(p.kind(), ProviderKind::Groq);
        assert_eq!(p.display_name(), "Groq");
    }

    #[test]
    fn test_build_body_skips_empty_system() {
        let body = GroqProvider::build_body(&request(), true);
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
        assert!(body.stream);
        assert_eq!(body.temperature, 0.2);
        assert_eq!(body.max_tokens, 1024);
    }

    #[tokio::test]
    async fn test_generate_without_key_fails_fast() {
        let p = GroqProvider::new(Arc::new(CredentialStore::in_memory()));
        let result = p.generate(&request(), &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(ProviderError::MissingKey(ProviderKind::Groq))
        ));
    }

    #[test]
    fn test_parse_chunk_content_and_finish() {
        let delta = GroqProvider::parse_chunk(
            r#"{"choices":[{"delta":{"content":"fn main"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(delta.text, "fn main");
        assert!(!delta.done);

        let delta = GroqProvider::parse_chunk(
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert!(delta.text.is_empty());
        assert!(delta.done);
    }

    #[test]
    fn test_parse_chunk_inband_error() {
        let delta =
            GroqProvider::parse_chunk(r#"{"error":{"message":"rate limit reached"}}"#).unwrap();
        assert_eq!(delta.error.as_deref(), Some("rate limit reached"));
    }

    #[test]
    fn test_parse_chunk_malformed_skipped() {
        assert!(GroqProvider::parse_chunk("garbage").is_none());
        assert!(GroqProvider::parse_chunk(r#"{"choices":[]}"#).is_none());
    }
}
