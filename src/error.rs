//! Top-level error type for orchestrated generation.

use thiserror::Error;

use crate::config::ConfigError;
use crate::credentials::CredentialError;
use crate::providers::{ProviderError, ProviderKind};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The selected model's provider has no stored credential. This is a
    /// configuration problem and is always surfaced to the caller instead
    /// of being papered over by the local fallback.
    #[error("no credential configured for provider {provider}")]
    MissingCredential { provider: ProviderKind },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("generation cancelled")]
    Cancelled,
}
