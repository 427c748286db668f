//! codeforge — multi-provider AI code-generation orchestration.
//!
//! The crate exposes two entry points on [`Orchestrator`]: a one-shot
//! [`Orchestrator::generate_code`] call and a progress-callback-driven
//! [`Orchestrator::stream_code_generation`] call. Around them sit a static
//! model catalog with rule-based selection, a prompt composer, four vendor
//! adapters normalizing each provider's wire protocol, a credential store
//! with pluggable durable sinks, and a deterministic local fallback used
//! when a vendor call fails.
//!
//! ```no_run
//! use std::sync::Arc;
//! use codeforge::{Config, CredentialStore, Orchestrator};
//! use codeforge::types::{GenerationOptions, GenerationRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), codeforge::OrchestratorError> {
//! let credentials = Arc::new(CredentialStore::in_memory());
//! let orchestrator = Orchestrator::new(Config::default(), credentials);
//!
//! let request = GenerationRequest {
//!     prompt: "a checkout page with a cart summary".into(),
//!     options: GenerationOptions {
//!         framework: "react".into(),
//!         project_type: "ecommerce".into(),
//!         ..Default::default()
//!     },
//!     user_id: None,
//!     project_id: None,
//! };
//!
//! let result = orchestrator
//!     .generate_code(&request, &CancellationToken::new())
//!     .await?;
//! println!("{}", result.code);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fallback;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod types;

pub use config::{Config, ConfigError};
pub use credentials::{CredentialError, CredentialStore, SecretSink};
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use providers::{CodegenProvider, ProviderError, ProviderKind};
