//! File-based secret sink.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::SecretSink;
use crate::credentials::error::CredentialError;
use crate::providers::ProviderKind;

/// File permissions for secret files (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Directory permissions (Unix only): owner read/write/execute.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// On-disk envelope for one secret.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSecret {
    provider: String,
    secret: String,
    updated_at: DateTime<Utc>,
}

/// File-based secret sink.
///
/// Stores one JSON file per provider in a configurable directory, path
/// `{dir}/{provider}.json`. Files are written 0600 under a 0700 directory
/// on Unix, via a temp file and atomic rename.
#[derive(Debug, Clone)]
pub struct FileSecretSink {
    dir: PathBuf,
}

impl FileSecretSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn provider_path(&self, provider: ProviderKind) -> PathBuf {
        // ProviderKind is a closed enum, so the file name is always a safe
        // fixed identifier.
        self.dir.join(format!("{}.json", provider.as_str()))
    }

    fn ensure_dir(&self) -> Result<(), CredentialError> {
        if self.dir.exists() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            CredentialError::Storage(format!(
                "Failed to create secret directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(DIR_MODE);
            std::fs::set_permissions(&self.dir, perms).map_err(|e| {
                CredentialError::Storage(format!(
                    "Failed to set directory permissions on '{}': {}",
                    self.dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

impl SecretSink for FileSecretSink {
    #[instrument(skip(self))]
    fn load(&self, provider: ProviderKind) -> Result<Option<String>, CredentialError> {
        let path = self.provider_path(provider);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CredentialError::Storage(format!(
                    "Failed to read secret file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let stored: StoredSecret = serde_json::from_str(&content)?;
        Ok(Some(stored.secret))
    }

    #[instrument(skip(self, secret))]
    fn save(&self, provider: ProviderKind, secret: &str) -> Result<(), CredentialError> {
        self.ensure_dir()?;

        let path = self.provider_path(provider);
        let stored = StoredSecret {
            provider: provider.as_str().to_string(),
            secret: secret.to_string(),
            updated_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&stored)?;

        // Temp file then rename, so a crash never leaves a half-written
        // secret. Permissions are set at creation time on Unix.
        let temp_path = path.with_extension("tmp");

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(FILE_MODE)
                .open(&temp_path)
                .map_err(|e| {
                    CredentialError::Storage(format!(
                        "Failed to create temp file '{}': {}",
                        temp_path.display(),
                        e
                    ))
                })?;
            file.write_all(content.as_bytes()).map_err(|e| {
                CredentialError::Storage(format!(
                    "Failed to write temp file '{}': {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.sync_all().map_err(|e| {
                CredentialError::Storage(format!(
                    "Failed to sync temp file '{}': {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        #[cfg(not(unix))]
        {
            std::fs::write(&temp_path, &content).map_err(|e| {
                CredentialError::Storage(format!(
                    "Failed to write temp file '{}': {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if let Err(e) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(CredentialError::Storage(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                path.display(),
                e
            )));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    fn remove(&self, provider: ProviderKind) -> Result<(), CredentialError> {
        let path = self.provider_path(provider);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredentialError::Storage(format!(
                "Failed to remove secret file '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}
