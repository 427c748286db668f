//! Generation orchestrator.
//!
//! The façade callers interact with. Ties together model selection, prompt
//! composition, credential lookup, adapter dispatch, and degradation to the
//! local fallback when a vendor call fails.
//!
//! Failure policy: a missing credential is a configuration error and always
//! surfaces as [`OrchestratorError::MissingCredential`]. Vendor-level
//! failures (transport errors, non-success responses, mid-stream drops) are
//! recovered locally instead, so callers get degraded content rather than
//! an error. A vendor-reported in-band error is neither: it becomes the
//! terminal progress event with the error populated and no fallback runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::{self, ModelDescriptor};
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::OrchestratorError;
use crate::fallback;
use crate::prompt;
use crate::providers::{
    AdapterRequest, AnthropicProvider, CodegenProvider, GoogleProvider, GroqProvider,
    OpenAiProvider, ProviderError, ProviderKind,
};
use crate::types::{
    FileKind, GeneratedFile, GenerationMetadata, GenerationOptions, GenerationRequest,
    GenerationResult, ProgressEvent,
};

// ---------------------------------------------------------------------------
// Simulated staging
// ---------------------------------------------------------------------------

/// Stage labels and progress checkpoints for the simulated fallback, in
/// emission order. Content starts accumulating at the third stage.
const SIMULATED_STAGES: [(&str, u8); 8] = [
    ("Analyzing requirements", 12),
    ("Planning architecture", 25),
    ("Scaffolding project", 37),
    ("Generating components", 50),
    ("Wiring integrations", 62),
    ("Applying styling", 75),
    ("Writing tests", 87),
    ("Finalizing output", 100),
];

/// Index of the first stage that appends content.
const FIRST_CONTENT_STAGE: usize = 2;

/// Progress estimates for a live vendor stream are capped here until the
/// vendor's own completion signal pushes them to 100.
const LIVE_PROGRESS_CAP: u8 = 95;

/// Assumed output size, in lines, when the caller gave no estimate.
const DEFAULT_ESTIMATED_LINES: u32 = 200;

fn stage_for_progress(progress: u8) -> &'static str {
    SIMULATED_STAGES
        .iter()
        .find(|(_, checkpoint)| progress <= *checkpoint)
        .map(|(label, _)| *label)
        .unwrap_or("Finalizing output")
}

fn estimate_progress(content: &str, estimated_lines: u32) -> u8 {
    let expected = if estimated_lines == 0 {
        DEFAULT_ESTIMATED_LINES
    } else {
        estimated_lines
    };
    let lines = content.lines().count() as u32;
    ((lines * 100) / expected).min(LIVE_PROGRESS_CAP as u32) as u8
}

fn estimate_completion(progress: u8) -> DateTime<Utc> {
    // Rough linear extrapolation; callers treat this as a hint only.
    let remaining_secs = ((100u16 - progress as u16) / 10) as i64 + 1;
    Utc::now() + chrono::Duration::seconds(remaining_secs)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Entry point for code generation. Explicitly constructed and cheap to
/// clone via `Arc`; holds one adapter per supported vendor.
pub struct Orchestrator {
    config: Config,
    credentials: Arc<CredentialStore>,
    openai: Arc<dyn CodegenProvider>,
    anthropic: Arc<dyn CodegenProvider>,
    google: Arc<dyn CodegenProvider>,
    groq: Arc<dyn CodegenProvider>,
}

impl Orchestrator {
    /// Build an orchestrator with the real vendor adapters, honoring any
    /// per-provider base-URL overrides in the config.
    pub fn new(config: Config, credentials: Arc<CredentialStore>) -> Self {
        let openai: Arc<dyn CodegenProvider> = match &config.base_urls.openai {
            Some(url) => Arc::new(OpenAiProvider::with_base_url(credentials.clone(), url)),
            None => Arc::new(OpenAiProvider::new(credentials.clone())),
        };
        let anthropic: Arc<dyn CodegenProvider> = match &config.base_urls.anthropic {
            Some(url) => Arc::new(AnthropicProvider::with_base_url(credentials.clone(), url)),
            None => Arc::new(AnthropicProvider::new(credentials.clone())),
        };
        let google: Arc<dyn CodegenProvider> = match &config.base_urls.google {
            Some(url) => Arc::new(GoogleProvider::with_base_url(credentials.clone(), url)),
            None => Arc::new(GoogleProvider::new(credentials.clone())),
        };
        let groq: Arc<dyn CodegenProvider> = match &config.base_urls.groq {
            Some(url) => Arc::new(GroqProvider::with_base_url(credentials.clone(), url)),
            None => Arc::new(GroqProvider::new(credentials.clone())),
        };

        Self::with_adapters(config, credentials, openai, anthropic, google, groq)
    }

    /// Build an orchestrator around injected adapters. This is how tests
    /// substitute stub vendors without touching the network.
    pub fn with_adapters(
        config: Config,
        credentials: Arc<CredentialStore>,
        openai: Arc<dyn CodegenProvider>,
        anthropic: Arc<dyn CodegenProvider>,
        google: Arc<dyn CodegenProvider>,
        groq: Arc<dyn CodegenProvider>,
    ) -> Self {
        Self {
            config,
            credentials,
            openai,
            anthropic,
            google,
            groq,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    fn adapter_for(&self, kind: ProviderKind) -> &Arc<dyn CodegenProvider> {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Google => &self.google,
            ProviderKind::Groq => &self.groq,
        }
    }

    /// Selection, prompt composition, and the credential gate, shared by
    /// both entry points.
    fn prepare(
        &self,
        request: &GenerationRequest,
    ) -> Result<(&'static ModelDescriptor, AdapterRequest), OrchestratorError> {
        let model = catalog::select_optimal_model(&request.options);
        debug!(model = model.id, provider = %model.provider, "selected model");

        if !self.credentials.has(model.provider) {
            return Err(OrchestratorError::MissingCredential {
                provider: model.provider,
            });
        }

        let adapter_request = AdapterRequest {
            model: model.id.to_string(),
            prompt: prompt::build_user_prompt(&request.prompt, &request.options),
            system_prompt: prompt::build_system_prompt(&request.options),
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
        };
        Ok((model, adapter_request))
    }

    // -----------------------------------------------------------------------
    // Non-streaming path
    // -----------------------------------------------------------------------

    /// One-shot generation. Vendor failures degrade to the local fallback;
    /// only a missing credential or cancellation surface as errors.
    #[instrument(skip(self, request, cancel), fields(framework = %request.options.framework))]
    pub async fn generate_code(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, OrchestratorError> {
        let started = Instant::now();
        let (model, adapter_request) = self.prepare(request)?;
        let adapter = self.adapter_for(model.provider);

        let (code, model_used) = match adapter.generate(&adapter_request, cancel).await {
            Ok(code) => (code, model.display_name.to_string()),
            Err(ProviderError::Cancelled) => return Err(OrchestratorError::Cancelled),
            Err(ProviderError::MissingKey(provider)) => {
                return Err(OrchestratorError::MissingCredential { provider });
            }
            Err(err) => {
                warn!(model = model.id, error = %err, "vendor call failed, using local fallback");
                let code = fallback::synthesize(
                    &request.options.framework,
                    &request.options.project_type,
                    &request.prompt,
                );
                (code, model.display_name.to_string())
            }
        };

        let result = build_result(code, model_used, &request.options, started.elapsed());
        info!(
            model = model.id,
            tokens = result.metadata.token_count,
            elapsed_ms = result.metadata.generation_time_ms,
            "generation complete"
        );
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Streaming path
    // -----------------------------------------------------------------------

    /// Streaming generation. `on_event` receives every progress snapshot in
    /// emission order; exactly one event carries `is_complete`. The final
    /// accumulated content is also returned.
    #[instrument(skip(self, request, on_event, cancel), fields(framework = %request.options.framework))]
    pub async fn stream_code_generation<F>(
        &self,
        request: &GenerationRequest,
        mut on_event: F,
        cancel: &CancellationToken,
    ) -> Result<String, OrchestratorError>
    where
        F: FnMut(ProgressEvent),
    {
        let (model, adapter_request) = self.prepare(request)?;
        let adapter = self.adapter_for(model.provider);
        let id = Uuid::new_v4();

        let mut stream = match adapter.stream(&adapter_request, cancel).await {
            Ok(stream) => stream,
            Err(ProviderError::Cancelled) => return Err(OrchestratorError::Cancelled),
            Err(ProviderError::MissingKey(provider)) => {
                return Err(OrchestratorError::MissingCredential { provider });
            }
            Err(err) => {
                warn!(model = model.id, error = %err, "stream open failed, simulating");
                return self
                    .simulated_stream(
                        id,
                        model,
                        &request.options,
                        String::new(),
                        0,
                        &mut on_event,
                        cancel,
                    )
                    .await;
            }
        };

        let mut content = String::new();
        let mut progress: u8 = 0;

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                item = stream.next() => item,
            };

            let delta = match item {
                // Framing always yields a terminal delta, so a bare end of
                // stream means the transport dropped mid-generation.
                None => {
                    warn!(model = model.id, "stream ended without completion, simulating");
                    return self
                        .simulated_stream(
                            id,
                            model,
                            &request.options,
                            content,
                            progress,
                            &mut on_event,
                            cancel,
                        )
                        .await;
                }
                Some(Err(ProviderError::Cancelled)) => return Err(OrchestratorError::Cancelled),
                Some(Err(err)) => {
                    warn!(model = model.id, error = %err, "stream failed mid-flight, simulating");
                    return self
                        .simulated_stream(
                            id,
                            model,
                            &request.options,
                            content,
                            progress,
                            &mut on_event,
                            cancel,
                        )
                        .await;
                }
                Some(Ok(delta)) => delta,
            };

            if let Some(error) = delta.error {
                warn!(model = model.id, error = %error, "vendor reported in-band error");
                on_event(ProgressEvent {
                    id,
                    model_used: model.display_name.to_string(),
                    content: content.clone(),
                    progress,
                    stage: "Failed".to_string(),
                    estimated_completion: Utc::now(),
                    is_complete: true,
                    error: Some(error),
                });
                return Ok(content);
            }

            content.push_str(&delta.text);

            if delta.done {
                on_event(ProgressEvent {
                    id,
                    model_used: model.display_name.to_string(),
                    content: content.clone(),
                    progress: 100,
                    stage: "Complete".to_string(),
                    estimated_completion: Utc::now(),
                    is_complete: true,
                    error: None,
                });
                info!(model = model.id, chars = content.len(), "stream complete");
                return Ok(content);
            }

            // Empty deltas (keep-alive-like units) still get a snapshot:
            // one event per successfully parsed unit.
            progress = progress.max(estimate_progress(
                &content,
                request.options.complexity.estimated_lines,
            ));
            on_event(ProgressEvent {
                id,
                model_used: model.display_name.to_string(),
                content: content.clone(),
                progress,
                stage: stage_for_progress(progress).to_string(),
                estimated_completion: estimate_completion(progress),
                is_complete: false,
                error: None,
            });
        }
    }

    /// Emit the fixed simulated stage sequence in place of a failed vendor
    /// stream. Deterministic apart from timestamps and pacing.
    ///
    /// `content` and `floor` carry whatever the real stream already
    /// delivered, so after a mid-flight failure the sequence keeps growing
    /// the same transcript: fragments append to the seed, and each stage's
    /// progress is floored at the last emitted value.
    async fn simulated_stream<F>(
        &self,
        id: Uuid,
        model: &ModelDescriptor,
        options: &GenerationOptions,
        mut content: String,
        floor: u8,
        on_event: &mut F,
        cancel: &CancellationToken,
    ) -> Result<String, OrchestratorError>
    where
        F: FnMut(ProgressEvent),
    {
        let label = format!("{} (Simulated)", model.display_name);
        let fragments = fallback::staged_fragments(&options.framework);
        let delay = Duration::from_millis(self.config.simulated_stage_delay_ms);

        for (index, (stage, progress)) in SIMULATED_STAGES.iter().enumerate() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            if index >= FIRST_CONTENT_STAGE {
                content.push_str(fragments[index - FIRST_CONTENT_STAGE]);
            }

            let progress = (*progress).max(floor);
            let is_complete = index == SIMULATED_STAGES.len() - 1;
            on_event(ProgressEvent {
                id,
                model_used: label.clone(),
                content: content.clone(),
                progress,
                stage: (*stage).to_string(),
                estimated_completion: estimate_completion(progress),
                is_complete,
                error: None,
            });
        }

        info!(model = model.id, "simulated stream complete");
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Result assembly
// ---------------------------------------------------------------------------

fn build_result(
    code: String,
    model_used: String,
    options: &GenerationOptions,
    elapsed: Duration,
) -> GenerationResult {
    let file = derive_file(&code, &options.framework);
    let documentation = format!(
        "Generated {} {} application code targeting {}.",
        options.complexity.tier.label(),
        if options.project_type.is_empty() {
            "generic"
        } else {
            &options.project_type
        },
        if options.framework.is_empty() {
            "no specific framework"
        } else {
            &options.framework
        },
    );

    let metadata = GenerationMetadata {
        model_used,
        token_count: code.split_whitespace().count() as u32,
        generation_time_ms: elapsed.as_millis() as u64,
        complexity: options.complexity.tier,
        frameworks: options.complexity.frameworks.clone(),
        quality_score: estimate_quality(&code),
    };

    GenerationResult {
        code,
        files: vec![file],
        documentation,
        test_code: None,
        metadata,
    }
}

fn derive_file(code: &str, framework: &str) -> GeneratedFile {
    let (path, kind, language) = if fallback::is_php_framework(framework) {
        (
            "app/Http/Controllers/GeneratedController.php",
            FileKind::Source,
            "php",
        )
    } else if fallback::is_frontend_framework(framework) {
        ("src/GeneratedApp.tsx", FileKind::Component, "typescript")
    } else {
        ("src/main.js", FileKind::Source, "javascript")
    };

    GeneratedFile {
        path: path.to_string(),
        content: code.to_string(),
        kind,
        language: language.to_string(),
    }
}

/// Crude quality heuristic over the generated text. Longer, structured
/// output scores higher; never reaches 1.0.
fn estimate_quality(code: &str) -> f32 {
    let mut score: f32 = 0.5;
    if code.len() > 500 {
        score += 0.15;
    }
    if code.len() > 2_000 {
        score += 0.15;
    }
    if code.contains("function") || code.contains("fn ") || code.contains("class") {
        score += 0.1;
    }
    score.min(0.95)
}
