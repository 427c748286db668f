//! Provider adapters.
//!
//! Defines the closed set of supported vendors ([`ProviderKind`]), the
//! [`CodegenProvider`] adapter contract, and error types, plus one sub-module
//! per concrete vendor protocol and the shared chunk-framing parsers.

pub mod anthropic;
pub mod framing;
pub mod google;
pub mod groq;
pub mod openai;

use std::future::Future;
use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub use self::anthropic::AnthropicProvider;
pub use self::google::GoogleProvider;
pub use self::groq::GroqProvider;
pub use self::openai::OpenAiProvider;

// ---------------------------------------------------------------------------
// ProviderKind
// ---------------------------------------------------------------------------

/// The closed set of external vendors. Adding a provider means adding a
/// variant here and letting the compiler point at every dispatch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    Groq,
}

impl ProviderKind {
    /// All known providers, in catalog order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::Groq,
    ];

    /// Stable string identifier, used for storage keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::Groq => "groq",
        }
    }

    /// Parse a stable identifier back into a kind.
    pub fn from_str_id(s: &str) -> Option<ProviderKind> {
        match s {
            "openai" => Some(ProviderKind::OpenAi),
            "anthropic" => Some(ProviderKind::Anthropic),
            "google" => Some(ProviderKind::Google),
            "groq" => Some(ProviderKind::Groq),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// Errors that can occur during adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No API key configured for {0}")]
    MissingKey(ProviderKind),

    #[error("Credential error: {0}")]
    Credential(#[from] crate::credentials::CredentialError),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Request cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Adapter request / stream items
// ---------------------------------------------------------------------------

/// Provider-agnostic request handed to an adapter. Prompt composition and
/// model selection have already happened by the time this is built.
#[derive(Debug, Clone)]
pub struct AdapterRequest {
    /// Vendor-declared model name, e.g. "gpt-4o" or "claude-3-5-sonnet".
    pub model: String,
    pub prompt: String,
    pub system_prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// One successfully parsed unit of a vendor stream.
///
/// `text` carries the incremental delta (possibly empty), `done` marks the
/// vendor's completion signal, and `error` carries an in-band error the
/// vendor reported inside its own protocol, as opposed to a transport
/// failure (those surface as `Err(ProviderError)` stream items).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDelta {
    pub text: String,
    pub done: bool,
    pub error: Option<String>,
}

impl StreamDelta {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn done() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }
}

/// Boxed stream of parsed vendor frames.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamDelta, ProviderError>> + Send>>;

// ---------------------------------------------------------------------------
// CodegenProvider trait
// ---------------------------------------------------------------------------

/// Contract every vendor adapter implements.
///
/// Async methods return boxed futures so the trait is dyn-compatible (usable
/// as `Arc<dyn CodegenProvider>`). Adapters own only the wire-format
/// translation for their vendor; they hold no session state between calls.
pub trait CodegenProvider: Send + Sync {
    /// Which vendor this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Human-readable vendor name for logs and progress labels.
    fn display_name(&self) -> &str;

    /// One blocking call to the vendor's non-streaming endpoint, returning
    /// the generated content. Non-success responses surface as
    /// [`ProviderError::Api`] carrying the vendor's status text.
    fn generate(
        &self,
        request: &AdapterRequest,
        cancel: &CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + '_>>;

    /// Open the vendor's streaming endpoint and yield one [`StreamDelta`]
    /// per successfully parsed frame. Frames that fail to parse as the
    /// vendor's expected shape are skipped, not surfaced. Exactly one delta
    /// has `done` set and no frames are read after it.
    fn stream(
        &self,
        request: &AdapterRequest,
        cancel: &CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<DeltaStream, ProviderError>> + Send + '_>>;
}
