//! Core value objects shared across the orchestration layer.
//!
//! Everything here is created fresh per request and discarded afterwards;
//! the only long-lived mutable state in the crate lives in
//! [`crate::credentials::CredentialStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Relative latency class of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedTier {
    Fast,
    Medium,
    Slow,
}

/// Task complexity class, used both as a model capability ceiling and as a
/// request-side estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Simple,
    #[default]
    Medium,
    Complex,
    Enterprise,
}

impl ComplexityTier {
    /// Lowercase label for documentation and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            ComplexityTier::Simple => "simple",
            ComplexityTier::Medium => "medium",
            ComplexityTier::Complex => "complex",
            ComplexityTier::Enterprise => "enterprise",
        }
    }
}

// ---------------------------------------------------------------------------
// Generation options
// ---------------------------------------------------------------------------

/// Caller-supplied size/shape estimate for the requested generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplexityEstimate {
    pub tier: ComplexityTier,
    /// Rough expected size of the generated output, in source lines. Used to
    /// scale streaming progress estimates; zero means "unknown".
    #[serde(default)]
    pub estimated_lines: u32,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default)]
    pub integrations: Vec<String>,
}

/// Per-request generation options. Read-only inside the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Target framework, e.g. "react", "vue", "laravel". Unknown values are
    /// accepted and degrade to generic prompt/fallback templates.
    pub framework: String,
    /// Target project type, e.g. "ecommerce", "dashboard", "fullstack".
    pub project_type: String,
    #[serde(default)]
    pub complexity: ComplexityEstimate,
    /// Opaque feature tags, rendered as bullets in the system prompt.
    #[serde(default)]
    pub features: Vec<String>,
    /// Hint that the caller intends to stream and favors fast iteration.
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// One code-generation invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Free-text description of what to build.
    pub prompt: String,
    pub options: GenerationOptions,
    /// Optional attribution; not interpreted by the core.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Streaming progress
// ---------------------------------------------------------------------------

/// One incremental update delivered during a streaming generation.
///
/// Within a single generation: `content` only ever grows, `progress` is
/// non-decreasing, and exactly one event (the last) has `is_complete` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Correlation id, constant across all events of one generation.
    pub id: uuid::Uuid,
    /// Display name of the model producing the content. Carries a
    /// `" (Simulated)"` suffix when the local staged fallback is active.
    pub model_used: String,
    /// Accumulated content so far, never truncated.
    pub content: String,
    /// 0..=100, non-decreasing within one generation.
    pub progress: u8,
    /// Human-readable stage label, e.g. "Generating components".
    pub stage: String,
    pub estimated_completion: DateTime<Utc>,
    pub is_complete: bool,
    #[serde(default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Non-streaming result
// ---------------------------------------------------------------------------

/// Category tag for a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Component,
    Source,
    Config,
    Test,
    Documentation,
}

/// One file produced by a generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
    pub kind: FileKind,
    pub language: String,
}

/// Metadata attached to a completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub model_used: String,
    /// Crude whitespace-token count of the generated code.
    pub token_count: u32,
    pub generation_time_ms: u64,
    pub complexity: ComplexityTier,
    pub frameworks: Vec<String>,
    /// Heuristic 0.0..=1.0 quality estimate.
    pub quality_score: f32,
}

/// Result of the non-streaming generation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub code: String,
    pub files: Vec<GeneratedFile>,
    pub documentation: String,
    #[serde(default)]
    pub test_code: Option<String>,
    pub metadata: GenerationMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_tier_default_is_medium() {
        assert_eq!(ComplexityTier::default(), ComplexityTier::Medium);
    }

    #[test]
    fn test_options_roundtrip_json() {
        let opts = GenerationOptions {
            framework: "react".into(),
            project_type: "dashboard".into(),
            complexity: ComplexityEstimate {
                tier: ComplexityTier::Simple,
                estimated_lines: 120,
                frameworks: vec!["react".into()],
                integrations: vec![],
            },
            features: vec!["auth".into(), "charts".into()],
            streaming: true,
            temperature: Some(0.4),
            max_tokens: None,
        };
        let json = serde_json::to_string(&opts).unwrap();
        let back: GenerationOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back.framework, "react");
        assert_eq!(back.features.len(), 2);
        assert!(back.streaming);
    }

    #[test]
    fn test_options_accept_minimal_json() {
        let back: GenerationOptions =
            serde_json::from_str(r#"{"framework":"vue","project_type":"blog"}"#).unwrap();
        assert_eq!(back.framework, "vue");
        assert!(!back.streaming);
        assert_eq!(back.complexity.tier, ComplexityTier::Medium);
    }
}
