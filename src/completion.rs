//! The generative text service boundary.
//!
//! The pipeline only needs one operation from the outside world: given system
//! instructions and a user payload, return a single text completion plus
//! token counts. [`CompletionService`] is that seam; [`LlmCompletionService`]
//! is the production implementation over `edgequake-llm`, and tests substitute
//! a canned mock so no network is involved.
//!
//! There is deliberately no retry here: a segmentation call is expensive and
//! its failure modes (quota, malformed output) are not improved by blind
//! repetition. Retrying is a caller/UI decision.

use crate::config::GenerationConfig;
use crate::error::OkumaError;
use crate::prompts::SegmentationRequest;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// A single completion with the token usage the quota collaborator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Generative text service: one request in, one completion out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &SegmentationRequest) -> Result<Completion, OkumaError>;
}

/// Production [`CompletionService`] over an `edgequake-llm` provider.
pub struct LlmCompletionService {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmCompletionService {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    /// Build the service from config, resolving the provider through the
    /// fallback chain in [`resolve_provider`].
    pub fn from_config(config: &GenerationConfig) -> Result<Self, OkumaError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config.temperature, config.max_tokens))
    }
}

#[async_trait]
impl CompletionService for LlmCompletionService {
    async fn complete(&self, request: &SegmentationRequest) -> Result<Completion, OkumaError> {
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.user.as_str()),
        ];

        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| OkumaError::CompletionFailed {
                message: e.to_string(),
            })?;

        debug!(
            "Segmentation completion: {} in / {} out tokens",
            response.prompt_tokens, response.completion_tokens
        );

        Ok(Completion {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, OkumaError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        OkumaError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is; the caller may
///    have wrapped it in caching or rate-limiting middleware.
/// 2. **Named provider + model** (`config.provider_name`) — the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`OKUMA_LLM_PROVIDER` + `OKUMA_MODEL`) — a choice
///    made at the execution-environment level (shell script, CI), honoured
///    before full auto-detection even when several API keys are present.
/// 4. **Full auto-detection** — prefer OpenAI when `OPENAI_API_KEY` is set,
///    else let `ProviderFactory::from_env` scan the known key variables.
pub fn resolve_provider(config: &GenerationConfig) -> Result<Arc<dyn LLMProvider>, OkumaError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4o-mini");
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("OKUMA_LLM_PROVIDER"),
        std::env::var("OKUMA_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4o-mini");
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| OkumaError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
