//! Error types for credential storage.

/// Errors that can occur while storing or retrieving provider secrets.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Durable sink failure (filesystem, keyring, ...).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Secret failed serialization for the durable sink.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}
