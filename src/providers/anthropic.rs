//! Anthropic provider.
//!
//! Speaks the Messages API: `x-api-key` + `anthropic-version` headers,
//! top-level `system` field, SSE streaming with a typed event envelope
//! (`content_block_delta`, `message_stop`, `error`, ...).

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

const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8_192;
const DEFAULT_TEMPERATURE: f32 = 0.7;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// SSE event envelope. Only the variants the adapter acts on carry fields;
/// everything else deserializes to its unit variant and is skipped upstream.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamEvent {
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: BlockDelta },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "error")]
    Error { error: StreamError },
    #[serde(rename = "message_start")]
    MessageStart,
    #[serde(rename = "content_block_start")]
    ContentBlockStart,
    #[serde(rename = "content_block_stop")]
    ContentBlockStop,
    #[serde(rename = "message_delta")]
    MessageDelta,
    #[serde(rename = "ping")]
    Ping,
}

#[derive(Debug, Deserialize)]
struct BlockDelta {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Adapter for the Anthropic Messages API.
pub struct AnthropicProvider {
    http: Client,
    credentials: Arc<CredentialStore>,
    base_url: String,
}

impl AnthropicProvider {
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
            .get(ProviderKind::Anthropic)?
            .ok_or(ProviderError::MissingKey(ProviderKind::Anthropic))
    }

    fn build_body(request: &AdapterRequest, stream: bool) -> MessagesRequest {
        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: request.system_prompt.clone(),
            messages: vec![WireMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            stream,
        }
    }

    /// Interpret one SSE frame payload. Events the adapter does not act on
    /// (`ping`, block boundaries) are skipped by returning `None`.
    fn parse_event(data: &str) -> Option<StreamDelta> {
        let event: StreamEvent = serde_json::from_str(data).ok()?;
        match event {
            StreamEvent::ContentBlockDelta { delta } if delta.kind == "text_delta" => {
                Some(StreamDelta::text(delta.text))
            }
            StreamEvent::MessageStop => Some(StreamDelta::done()),
            StreamEvent::Error { error } => Some(StreamDelta {
                error: Some(error.message),
                ..StreamDelta::default()
            }),
            _ => None,
        }
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
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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

impl CodegenProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn display_name(&self) -> &str {
        "Anthropic"
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
            let api: MessagesResponse = resp.json().await?;
            let text = api
                .content
                .into_iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text),
                    ContentBlock::Other => None,
                })
                .collect::<Vec<_>>()
                .join("");
            Ok(text)
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
                Self::parse_event,
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
