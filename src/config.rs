//! Configuration for card generation.
//!
//! Every knob lives in one [`GenerationConfig`] struct built via its
//! [`GenerationConfigBuilder`]. Keeping the knobs together makes configs
//! cheap to clone across calls, easy to log, and easy to diff when two runs
//! produce different cards.
//!
//! # Design choice: builder over constructor
//! A twelve-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::cards::ResponseContract;
use crate::error::OkumaError;
use crate::prompts::PromptVariant;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one or more card-generation runs.
///
/// Built via [`GenerationConfig::builder()`] or [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use okuma_cards::{GenerationConfig, ResponseContract};
///
/// let config = GenerationConfig::builder()
///     .language("tur")
///     .page_range("0-4")
///     .contract(ResponseContract::Json)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// OCR language code passed to the engine. Default: `"tur"`.
    pub language: String,

    /// Upscaling factor applied when rasterising each page. Default: 2.0.
    ///
    /// OCR accuracy depends on this: at native resolution small Turkish
    /// diacritics blur into their base letters and recognition measurably
    /// degrades. 2x is the empirical sweet spot; beyond ~4x the images cost
    /// memory without further accuracy gains.
    pub ocr_scale: f32,

    /// User-facing page-range spec: `"all"` or a 0-indexed `"A-B"` pair.
    /// Default: `"all"`. Resolved against the document's page count before
    /// any rendering starts.
    pub page_range: String,

    /// Which segmentation instruction set to use. Default: [`PromptVariant::Default`].
    pub prompt: PromptVariant,

    /// Which output contract the generator is held to. Default:
    /// [`ResponseContract::Delimited`]. Selected here, never inferred from
    /// the response body.
    pub contract: ResponseContract,

    /// LLM model identifier, e.g. "gpt-4o-mini". If None, uses the provider
    /// default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic"). If None along with
    /// `provider`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the segmentation completion. Default: 0.3.
    ///
    /// Low temperature keeps the model faithful to the source text — exactly
    /// what a partition-without-paraphrasing task wants.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per segmentation call. Default: 4000.
    pub max_tokens: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Path to an existing pdfium shared library.
    ///
    /// When set, the rendering engine binds to this library; when None, the
    /// system default binding is used. An explicit config value rather than a
    /// module-level side effect, so embedding applications control where the
    /// engine comes from.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            language: "tur".to_string(),
            ocr_scale: 2.0,
            page_range: "all".to_string(),
            prompt: PromptVariant::default(),
            contract: ResponseContract::default(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 4000,
            download_timeout_secs: 120,
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("language", &self.language)
            .field("ocr_scale", &self.ocr_scale)
            .field("page_range", &self.page_range)
            .field("prompt", &self.prompt)
            .field("contract", &self.contract)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn ocr_scale(mut self, scale: f32) -> Self {
        self.config.ocr_scale = scale.clamp(1.0, 4.0);
        self
    }

    pub fn page_range(mut self, spec: impl Into<String>) -> Self {
        self.config.page_range = spec.into();
        self
    }

    pub fn prompt(mut self, variant: PromptVariant) -> Self {
        self.config.prompt = variant;
        self
    }

    pub fn contract(mut self, contract: ResponseContract) -> Self {
        self.config.contract = contract;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, OkumaError> {
        let c = &self.config;
        if c.language.trim().is_empty() {
            return Err(OkumaError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if !(1.0..=4.0).contains(&c.ocr_scale) {
            return Err(OkumaError::InvalidConfig(format!(
                "ocr_scale must be 1.0–4.0, got {}",
                c.ocr_scale
            )));
        }
        if c.max_tokens == 0 {
            return Err(OkumaError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}
