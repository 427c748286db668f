//! Static model catalog and the selection function.
//!
//! One descriptor per provider, loaded once at process start. Selection is
//! a pure precedence over the request options; it always returns a catalog
//! entry (the first entry is the guaranteed default).

use serde::Serialize;

use crate::providers::ProviderKind;
use crate::types::{ComplexityTier, GenerationOptions, SpeedTier};

// ---------------------------------------------------------------------------
// Descriptor types
// ---------------------------------------------------------------------------

/// Operation class a model is tagged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// General code generation.
    CodeGeneration,
    /// System/architecture design across backend and frontend layers.
    Architecture,
}

/// One capability tag: an operation plus the frameworks and languages the
/// model handles well for it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelCapability {
    pub operation: OperationKind,
    pub frameworks: &'static [&'static str],
    pub languages: &'static [&'static str],
}

/// Static metadata about one selectable model/provider pairing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub provider: ProviderKind,
    pub capabilities: &'static [ModelCapability],
    pub max_context_tokens: u32,
    /// USD per 1K output tokens, for rough cost ranking.
    pub cost_per_1k_tokens: f64,
    pub speed: SpeedTier,
    /// Highest complexity tier the model is considered suitable for.
    pub complexity: ComplexityTier,
}

impl ModelDescriptor {
    /// Whether any capability tag lists the given framework.
    pub fn supports_framework(&self, framework: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.frameworks.iter().any(|f| f.eq_ignore_ascii_case(framework)))
    }

    /// Whether the model carries the given operation tag.
    pub fn has_operation(&self, operation: OperationKind) -> bool {
        self.capabilities.iter().any(|c| c.operation == operation)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

const FRONTEND_FRAMEWORKS: &[&str] = &["react", "vue", "nextjs", "svelte", "angular"];
const FRONTEND_LANGUAGES: &[&str] = &["typescript", "javascript"];
const PHP_FRAMEWORKS: &[&str] = &["laravel", "php", "symfony"];

/// The fixed model catalog. Entry 0 is the rule-4 default and must stay a
/// general-purpose high-capability model.
pub static CATALOG: [ModelDescriptor; 4] = [
    ModelDescriptor {
        id: "gpt-4o",
        display_name: "GPT-4o",
        provider: ProviderKind::OpenAi,
        capabilities: &[ModelCapability {
            operation: OperationKind::CodeGeneration,
            frameworks: FRONTEND_FRAMEWORKS,
            languages: FRONTEND_LANGUAGES,
        }],
        max_context_tokens: 128_000,
        cost_per_1k_tokens: 0.005,
        speed: SpeedTier::Medium,
        complexity: ComplexityTier::Complex,
    },
    ModelDescriptor {
        id: "claude-3-5-sonnet",
        display_name: "Claude 3.5 Sonnet",
        provider: ProviderKind::Anthropic,
        capabilities: &[
            ModelCapability {
                operation: OperationKind::CodeGeneration,
                frameworks: PHP_FRAMEWORKS,
                languages: &["php", "typescript"],
            },
            ModelCapability {
                operation: OperationKind::Architecture,
                frameworks: &["laravel", "fullstack"],
                languages: &["php", "typescript", "sql"],
            },
        ],
        max_context_tokens: 200_000,
        cost_per_1k_tokens: 0.003,
        speed: SpeedTier::Medium,
        complexity: ComplexityTier::Enterprise,
    },
    ModelDescriptor {
        id: "gemini-1.5-pro",
        display_name: "Gemini 1.5 Pro",
        provider: ProviderKind::Google,
        capabilities: &[ModelCapability {
            operation: OperationKind::CodeGeneration,
            frameworks: FRONTEND_FRAMEWORKS,
            languages: FRONTEND_LANGUAGES,
        }],
        max_context_tokens: 1_000_000,
        cost_per_1k_tokens: 0.001_25,
        speed: SpeedTier::Medium,
        complexity: ComplexityTier::Complex,
    },
    ModelDescriptor {
        id: "llama-3.1-70b-versatile",
        display_name: "Llama 3.1 70B",
        provider: ProviderKind::Groq,
        capabilities: &[ModelCapability {
            operation: OperationKind::CodeGeneration,
            frameworks: FRONTEND_FRAMEWORKS,
            languages: FRONTEND_LANGUAGES,
        }],
        max_context_tokens: 131_072,
        cost_per_1k_tokens: 0.000_8,
        speed: SpeedTier::Fast,
        complexity: ComplexityTier::Simple,
    },
];

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// The full catalog.
pub fn available_models() -> &'static [ModelDescriptor] {
    &CATALOG
}

/// Find a model by its identifier.
pub fn model_by_id(id: &str) -> Option<&'static ModelDescriptor> {
    CATALOG.iter().find(|m| m.id == id)
}

/// All models tagged with the given operation, in catalog order.
pub fn models_by_capability(operation: OperationKind) -> Vec<&'static ModelDescriptor> {
    CATALOG.iter().filter(|m| m.has_operation(operation)).collect()
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

fn is_php_target(framework: &str, project_type: &str) -> bool {
    let php = |s: &str| s.eq_ignore_ascii_case("laravel") || s.eq_ignore_ascii_case("php");
    php(framework) || php(project_type)
}

/// Pick the single best model for a request. Pure, total, deterministic;
/// ties break by catalog order.
///
/// Precedence, first match wins:
/// 1. Enterprise/complex work: the architecture-capable model for Laravel or
///    fullstack targets, otherwise the highest-context general-purpose model.
/// 2. PHP/Laravel targets: the model whose capability tags list that
///    framework.
/// 3. Simple work, or streaming requested for fast iteration: the fastest
///    and cheapest model.
/// 4. Otherwise the general-purpose high-capability default (entry 0).
pub fn select_optimal_model(options: &GenerationOptions) -> &'static ModelDescriptor {
    let framework = options.framework.as_str();
    let project_type = options.project_type.as_str();

    // Rule 1: heavy work goes to the biggest models.
    if matches!(
        options.complexity.tier,
        ComplexityTier::Enterprise | ComplexityTier::Complex
    ) {
        if framework.eq_ignore_ascii_case("laravel")
            || project_type.eq_ignore_ascii_case("fullstack")
        {
            if let Some(model) = CATALOG
                .iter()
                .find(|m| m.has_operation(OperationKind::Architecture))
            {
                return model;
            }
        }
        return highest_context_general_purpose();
    }

    // Rule 2: PHP/Laravel targets go to the model tagged for them.
    if is_php_target(framework, project_type) {
        if let Some(model) = CATALOG.iter().find(|m| m.supports_framework("laravel")) {
            return model;
        }
    }

    // Rule 3: fast iteration.
    if options.complexity.tier == ComplexityTier::Simple || options.streaming {
        return fastest_model();
    }

    // Rule 4: guaranteed default.
    default_model()
}

fn default_model() -> &'static ModelDescriptor {
    &CATALOG[0]
}

fn highest_context_general_purpose() -> &'static ModelDescriptor {
    let mut best = default_model();
    for m in CATALOG.iter().filter(|m| m.has_operation(OperationKind::CodeGeneration)) {
        // Strictly greater keeps the earlier entry on ties.
        if m.max_context_tokens > best.max_context_tokens {
            best = m;
        }
    }
    best
}

fn fastest_model() -> &'static ModelDescriptor {
    CATALOG
        .iter()
        .find(|m| m.speed == SpeedTier::Fast)
        .unwrap_or_else(default_model)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ComplexityEstimate;

    fn options(framework: &str, tier: ComplexityTier, streaming: bool) -> GenerationOptions {
        GenerationOptions {
            framework: framework.into(),
            project_type: "webapp".into(),
            complexity: ComplexityEstimate {
                tier,
                ..Default::default()
            },
            streaming,
            ..Default::default()
        }
    }

    #[test]
    fn test_enterprise_laravel_selects_architecture_model() {
        let opts = options("laravel", ComplexityTier::Enterprise, false);
        let model = select_optimal_model(&opts);
        assert_eq!(model.provider, ProviderKind::Anthropic);
        assert!(model.has_operation(OperationKind::Architecture));
    }

    #[test]
    fn test_enterprise_fullstack_selects_architecture_model() {
        let mut opts = options("react", ComplexityTier::Enterprise, false);
        opts.project_type = "fullstack".into();
        assert_eq!(select_optimal_model(&opts).provider, ProviderKind::Anthropic);
    }

    #[test]
    fn test_complex_frontend_selects_highest_context() {
        let opts = options("react", ComplexityTier::Complex, false);
        let model = select_optimal_model(&opts);
        assert_eq!(model.id, "gemini-1.5-pro");
        assert_eq!(model.max_context_tokens, 1_000_000);
    }

    #[test]
    fn test_php_target_selects_laravel_capable_model() {
        let opts = options("laravel", ComplexityTier::Medium, false);
        assert_eq!(select_optimal_model(&opts).provider, ProviderKind::Anthropic);

        let mut opts = options("blade", ComplexityTier::Medium, false);
        opts.project_type = "php".into();
        assert_eq!(select_optimal_model(&opts).provider, ProviderKind::Anthropic);
    }

    #[test]
    fn test_simple_streaming_selects_fastest() {
        let opts = options("react", ComplexityTier::Simple, true);
        let model = select_optimal_model(&opts);
        assert_eq!(model.provider, ProviderKind::Groq);
        assert_eq!(model.speed, SpeedTier::Fast);

        // Streaming alone is enough for rule 3.
        let opts = options("react", ComplexityTier::Medium, true);
        assert_eq!(select_optimal_model(&opts).provider, ProviderKind::Groq);
    }

    #[test]
    fn test_default_rule_matches_plain_requests() {
        let opts = options("react", ComplexityTier::Medium, false);
        assert_eq!(select_optimal_model(&opts).id, "gpt-4o");
    }

    #[test]
    fn test_unknown_framework_still_selects_something() {
        let opts = options("cobol-on-rails", ComplexityTier::Medium, false);
        assert_eq!(select_optimal_model(&opts).id, "gpt-4o");
    }

    #[test]
    fn test_selection_is_deterministic() {
        let opts = options("vue", ComplexityTier::Complex, true);
        let first = select_optimal_model(&opts);
        for _ in 0..10 {
            assert_eq!(select_optimal_model(&opts).id, first.id);
        }
    }

    #[test]
    fn test_model_by_id() {
        assert!(model_by_id("gpt-4o").is_some());
        assert!(model_by_id("gpt-5-turbo-mega").is_none());
    }

    #[test]
    fn test_models_by_capability() {
        let architects = models_by_capability(OperationKind::Architecture);
        assert_eq!(architects.len(), 1);
        assert_eq!(architects[0].provider, ProviderKind::Anthropic);

        let generators = models_by_capability(OperationKind::CodeGeneration);
        assert_eq!(generators.len(), 4);
    }

    #[test]
    fn test_one_model_per_provider() {
        for kind in ProviderKind::ALL {
            assert_eq!(
                CATALOG.iter().filter(|m| m.provider == kind).count(),
                1,
                "expected exactly one catalog entry for {kind}"
            );
        }
    }
}
