//! In-memory secret sink.

use std::collections::HashMap;
use std::sync::RwLock;

use super::SecretSink;
use crate::credentials::error::CredentialError;
use crate::providers::ProviderKind;

/// In-memory secret sink.
///
/// Nothing survives the process; useful for tests and ephemeral sessions
/// where the caller supplies keys at startup.
#[derive(Debug, Default)]
pub struct MemorySecretSink {
    inner: RwLock<HashMap<ProviderKind, String>>,
}

impl MemorySecretSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretSink for MemorySecretSink {
    fn load(&self, provider: ProviderKind) -> Result<Option<String>, CredentialError> {
        let guard = self.inner.read().expect("lock poisoned");
        Ok(guard.get(&provider).cloned())
    }

    fn save(&self, provider: ProviderKind, secret: &str) -> Result<(), CredentialError> {
        let mut guard = self.inner.write().expect("lock poisoned");
        guard.insert(provider, secret.to_string());
        Ok(())
    }

    fn remove(&self, provider: ProviderKind) -> Result<(), CredentialError> {
        let mut guard = self.inner.write().expect("lock poisoned");
        guard.remove(&provider);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
