//! Google provider.
//!
//! Speaks the Generative Language API: API key as query parameter,
//! `contents[].parts[].text` request body, streaming as newline-delimited
//! JSON objects carrying `candidates[0].content.parts[0].text` and a
//! `finishReason` stop field instead of a sentinel.

use std::pin::Pin;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::credentials::CredentialStore;
use crate::providers::framing::{self, NdjsonFramer};
use crate::providers::{
    AdapterRequest, CodegenProvider, DeltaStream, ProviderError, ProviderKind, StreamDelta,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MAX_TOKENS: u32 = 8_192;
const DEFAULT_TEMPERATURE: f32 = 0.7;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct WireContent {
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WirePart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Adapter for the Google Generative Language API.
pub struct GoogleProvider {
    http: Client,
    credentials: Arc<CredentialStore>,
    base_url: String,
}

impl GoogleProvider {
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
            .get(ProviderKind::Google)?
            .ok_or(ProviderError::MissingKey(ProviderKind::Google))
    }

    fn build_body(request: &AdapterRequest) -> GenerateContentRequest {
        // The generateContent body has no separate system slot; the system
        // instruction is prepended to the user text.
        let text = if request.system_prompt.is_empty() {
            request.prompt.clone()
        } else {
            format!("{}\n\n{}", request.system_prompt, request.prompt)
        };

        GenerateContentRequest {
            contents: vec![WireContent {
                parts: vec![WirePart { text }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                max_output_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            },
        }
    }

    /// Interpret one NDJSON frame. `None` means the frame does not match
    /// the vendor shape and is skipped.
    fn parse_chunk(data: &str) -> Option<StreamDelta> {
        let chunk: GenerateContentResponse = serde_json::from_str(data).ok()?;

        if let Some(err) = chunk.error {
            return Some(StreamDelta {
                error: Some(err.message),
                ..StreamDelta::default()
            });
        }

        let candidate = chunk.candidates.into_iter().next()?;
        let mut delta = StreamDelta::default();
        if let Some(content) = candidate.content {
            delta.text = content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("");
        }
        if candidate.finish_reason.is_some() {
            delta.done = true;
        }
        Some(delta)
    }

    fn extract_text(response: GenerateContentResponse) -> String {
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    async fn send_request(
        &self,
        request: &AdapterRequest,
        stream: bool,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, ProviderError> {
        let key = self.api_key()?;
        let body = Self::build_body(request);
        let method = if stream {
            "streamGenerateContent"
        } else {
            "generateContent"
        };

        let send = self
            .http
            .post(format!(
                "{}/models/{}:{}",
                self.base_url, request.model, method
            ))
            .query(&[("key", key.as_str())])
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

impl CodegenProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn display_name(&self) -> &str {
        "Google"
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
            let api: GenerateContentResponse = resp.json().await?;
            Ok(Self::extract_text(api))
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
                NdjsonFramer::new(),
                Self::parse_chunk,
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
