//! Durable secret sink trait.

use std::sync::Arc;

use crate::credentials::error::CredentialError;
use crate::providers::ProviderKind;

/// Trait for durable secret persistence backends.
///
/// The [`crate::credentials::CredentialStore`] keeps secrets in memory and
/// treats a sink as its write-through/read-through backing store, so the
/// orchestration core stays decoupled from storage mechanics (plain files,
/// OS keychain, a server-side vault). All implementations must be
/// thread-safe (`Send + Sync`).
pub trait SecretSink: Send + Sync {
    /// Load the persisted secret for a provider, if any.
    fn load(&self, provider: ProviderKind) -> Result<Option<String>, CredentialError>;

    /// Persist a secret for a provider, overwriting any previous value.
    fn save(&self, provider: ProviderKind, secret: &str) -> Result<(), CredentialError>;

    /// Remove the persisted secret for a provider. Removing an absent secret
    /// is not an error.
    fn remove(&self, provider: ProviderKind) -> Result<(), CredentialError>;

    /// Name of this backend, for logs.
    fn name(&self) -> &str;
}

// Blanket implementation for Arc<T>
impl<T: SecretSink + ?Sized> SecretSink for Arc<T> {
    fn load(&self, provider: ProviderKind) -> Result<Option<String>, CredentialError> {
        (**self).load(provider)
    }
    fn save(&self, provider: ProviderKind, secret: &str) -> Result<(), CredentialError> {
        (**self).save(provider, secret)
    }
    fn remove(&self, provider: ProviderKind) -> Result<(), CredentialError> {
        (**self).remove(provider)
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}
