//! Provider credential storage.
//!
//! [`CredentialStore`] holds one secret per provider in memory and writes
//! through to a durable [`SecretSink`] so keys survive restarts. It is the
//! only long-lived mutable state in the core: created once, shared via
//! `Arc`, read-mostly, last-write-wins on the rare admin-triggered writes.

pub mod error;
pub mod store;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

pub use self::error::CredentialError;
pub use self::store::{FileSecretSink, MemorySecretSink, SecretSink};
use crate::providers::ProviderKind;

#[cfg(feature = "system-keyring")]
pub use self::store::KeyringSecretSink;

/// In-memory credential slots backed by a durable sink.
pub struct CredentialStore {
    slots: RwLock<HashMap<ProviderKind, String>>,
    sink: Arc<dyn SecretSink>,
}

impl CredentialStore {
    /// Create a store backed by the given sink.
    pub fn new(sink: Arc<dyn SecretSink>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            sink,
        }
    }

    /// Create a store with no durable persistence (tests, ephemeral use).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySecretSink::new()))
    }

    /// Pick a sink from the config: file-backed when a credentials
    /// directory is configured, in-memory otherwise.
    pub fn from_config(config: &crate::config::Config) -> Self {
        match &config.credentials_dir {
            Some(dir) => Self::new(Arc::new(FileSecretSink::new(dir))),
            None => Self::in_memory(),
        }
    }

    /// Store or overwrite the secret for a provider, writing through to the
    /// durable sink.
    pub fn set(
        &self,
        provider: ProviderKind,
        secret: impl Into<String>,
    ) -> Result<(), CredentialError> {
        let secret = secret.into();
        self.sink.save(provider, &secret)?;
        let mut slots = self.slots.write().expect("lock poisoned");
        slots.insert(provider, secret);
        debug!(provider = %provider, sink = self.sink.name(), "Credential stored");
        Ok(())
    }

    /// Fetch the secret for a provider. On an in-memory miss the durable
    /// sink is consulted and, if it has the secret, the slot is repopulated.
    pub fn get(&self, provider: ProviderKind) -> Result<Option<String>, CredentialError> {
        {
            let slots = self.slots.read().expect("lock poisoned");
            if let Some(secret) = slots.get(&provider) {
                return Ok(Some(secret.clone()));
            }
        }

        match self.sink.load(provider)? {
            Some(secret) => {
                let mut slots = self.slots.write().expect("lock poisoned");
                slots.insert(provider, secret.clone());
                debug!(provider = %provider, sink = self.sink.name(), "Credential loaded from sink");
                Ok(Some(secret))
            }
            None => Ok(None),
        }
    }

    /// Whether a secret is configured for the provider. Sink failures count
    /// as "not configured" rather than propagating.
    pub fn has(&self, provider: ProviderKind) -> bool {
        match self.get(provider) {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(provider = %provider, error = %e, "Credential lookup failed");
                false
            }
        }
    }

    /// Remove a provider's secret from memory and from the durable sink.
    pub fn remove(&self, provider: ProviderKind) -> Result<(), CredentialError> {
        self.sink.remove(provider)?;
        let mut slots = self.slots.write().expect("lock poisoned");
        slots.remove(&provider);
        Ok(())
    }

    /// Providers from the fixed universe that currently have a secret.
    pub fn list_configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|p| self.has(*p))
            .collect()
    }

    /// Pure shape check on a secret for early UX feedback. A pass says
    /// nothing about whether the vendor will actually accept the key.
    pub fn validate_format(provider: ProviderKind, secret: &str) -> bool {
        let secret = secret.trim();
        match provider {
            // Anthropic keys share the "sk-" prefix, so exclude them here.
            ProviderKind::OpenAi => {
                secret.starts_with("sk-") && !secret.starts_with("sk-ant-") && secret.len() >= 20
            }
            ProviderKind::Anthropic => secret.starts_with("sk-ant-") && secret.len() >= 24,
            ProviderKind::Google => secret.starts_with("AIza") && secret.len() >= 35,
            ProviderKind::Groq => secret.starts_with("gsk_") && secret.len() >= 20,
        }
    }
}
