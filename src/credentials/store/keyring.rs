//! Keyring-based secret sink.

#[cfg(feature = "system-keyring")]
use tracing::instrument;

#[cfg(feature = "system-keyring")]
use super::SecretSink;
#[cfg(feature = "system-keyring")]
use crate::credentials::error::CredentialError;
#[cfg(feature = "system-keyring")]
use crate::providers::ProviderKind;

/// Secret sink backed by the system's native credential store.
///
/// One keyring entry per provider, account name = provider id. Feature-gated
/// behind `system-keyring`.
#[cfg(feature = "system-keyring")]
#[derive(Debug, Clone)]
pub struct KeyringSecretSink {
    /// Service name for keyring entries.
    service: String,
}

#[cfg(feature = "system-keyring")]
impl Default for KeyringSecretSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "system-keyring")]
impl KeyringSecretSink {
    /// Service name prefix for keyring entries.
    const SERVICE_NAME: &str = "codeforge";

    pub fn new() -> Self {
        Self {
            service: Self::SERVICE_NAME.to_string(),
        }
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, provider: ProviderKind) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, provider.as_str())
            .map_err(|e| CredentialError::Storage(format!("Keyring entry error: {e}")))
    }

    /// Check if the system keyring is usable at all.
    pub fn is_available() -> bool {
        match keyring::Entry::new("codeforge-test", "availability-check") {
            Ok(entry) => match entry.get_password() {
                Ok(_) => true,
                Err(keyring::Error::NoEntry) => true,
                Err(keyring::Error::NoStorageAccess(_)) => false,
                Err(keyring::Error::PlatformFailure(_)) => false,
                Err(_) => true,
            },
            Err(_) => false,
        }
    }
}

#[cfg(feature = "system-keyring")]
impl SecretSink for KeyringSecretSink {
    #[instrument(skip(self))]
    fn load(&self, provider: ProviderKind) -> Result<Option<String>, CredentialError> {
        match self.entry(provider)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::Storage(format!(
                "Keyring read error for {provider}: {e}"
            ))),
        }
    }

    #[instrument(skip(self, secret))]
    fn save(&self, provider: ProviderKind, secret: &str) -> Result<(), CredentialError> {
        self.entry(provider)?.set_password(secret).map_err(|e| {
            CredentialError::Storage(format!("Keyring write error for {provider}: {e}"))
        })
    }

    #[instrument(skip(self))]
    fn remove(&self, provider: ProviderKind) -> Result<(), CredentialError> {
        match self.entry(provider)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::Storage(format!(
                "Keyring delete error for {provider}: {e}"
            ))),
        }
    }

    fn name(&self) -> &str {
        "keyring"
    }
}
