//! Durable secret sink implementations.

pub mod file;
pub mod keyring;
pub mod memory;
pub mod trait_def;

// Re-exports
pub use file::FileSecretSink;
pub use memory::MemorySecretSink;
pub use trait_def::SecretSink;

#[cfg(feature = "system-keyring")]
pub use keyring::KeyringSecretSink;
