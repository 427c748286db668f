//! Runtime configuration.
//!
//! Everything defaults to a working setup; a TOML file only needs the keys
//! it wants to override. No request timeout is configured here on purpose:
//! the core enforces none, callers wrap calls in their own deadlines.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const DEFAULT_STAGE_DELAY_MS: u64 = 150;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-provider endpoint overrides, mainly for proxies and test servers.
/// `None` means the adapter's built-in default endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaseUrls {
    #[serde(default)]
    pub openai: Option<String>,
    #[serde(default)]
    pub anthropic: Option<String>,
    #[serde(default)]
    pub google: Option<String>,
    #[serde(default)]
    pub groq: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory for the file-backed secret sink. `None` selects the
    /// in-memory sink (or the system keyring when the caller wires one).
    #[serde(default)]
    pub credentials_dir: Option<PathBuf>,

    /// Artificial delay between simulated fallback stages.
    #[serde(default = "default_stage_delay_ms")]
    pub simulated_stage_delay_ms: u64,

    #[serde(default)]
    pub base_urls: BaseUrls,
}

fn default_stage_delay_ms() -> u64 {
    DEFAULT_STAGE_DELAY_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials_dir: None,
            simulated_stage_delay_ms: DEFAULT_STAGE_DELAY_MS,
            base_urls: BaseUrls::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. Missing keys fall back to
    /// their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
