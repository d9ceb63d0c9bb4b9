//! The OCR engine seam and the built-in vision-model implementation.
//!
//! OCR is a collaborator, not a core concern: the extraction loop only needs
//! "rasterised page + language in, recognised text + fractional progress
//! out". [`OcrEngine`] is that contract. The crate ships one production
//! implementation, [`VisionOcrEngine`], which sends the page image to a
//! vision-capable LLM and asks for a verbatim transcription — the same
//! mechanism classic OCR users get from tesseract, behind the same trait, so
//! deployments with a local tesseract binding can swap it in without touching
//! the pipeline.
//!
//! Engines report progress per page as a 0..=1 fraction. A vision call has no
//! incremental progress to report, so [`VisionOcrEngine`] emits 1.0 once the
//! transcription returns; streaming engines can emit as often as they like.

use crate::error::OkumaError;
use crate::pipeline::encode;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use image::DynamicImage;
use std::sync::Arc;
use tracing::debug;

/// Transcription instructions for the vision model. Faithfulness over
/// formatting: the output feeds a segmentation stage that must preserve the
/// original wording, so the transcription must too.
const TRANSCRIBE_SYSTEM_PROMPT: &str = "You are a meticulous OCR engine. \
Transcribe ALL text visible on the page image exactly as written, in reading \
order, as plain text. Do not translate, summarise, correct, or annotate. \
Output nothing but the transcription; output an empty response for a blank page.";

/// Per-page progress callback: 0..=1 for the current page only.
pub type OcrProgressFn<'a> = &'a (dyn Fn(f32) + Send + Sync);

/// Optical character recognition over a single rasterised page.
///
/// Implementations must be `Send + Sync`; the pipeline awaits full completion
/// of one page before rendering the next.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognise the text on one page image in the given language.
    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: OcrProgressFn<'_>,
    ) -> Result<String, OkumaError>;
}

/// [`OcrEngine`] backed by a vision-capable LLM provider.
pub struct VisionOcrEngine {
    provider: Arc<dyn LLMProvider>,
    max_tokens: usize,
}

impl VisionOcrEngine {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            max_tokens: 4096,
        }
    }

    pub fn with_max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }
}

#[async_trait]
impl OcrEngine for VisionOcrEngine {
    async fn recognize(
        &self,
        image: &DynamicImage,
        language: &str,
        progress: OcrProgressFn<'_>,
    ) -> Result<String, OkumaError> {
        let image_data = encode::encode_page(image).map_err(|e| OkumaError::Internal(format!(
            "image encoding failed: {e}"
        )))?;

        let system = format!(
            "{TRANSCRIBE_SYSTEM_PROMPT}\nThe page text is expected to be in language code '{language}'."
        );

        // Vision APIs require at least one user turn; the image carries all
        // the actual content.
        let messages = vec![
            ChatMessage::system(system.as_str()),
            ChatMessage::user_with_images("", vec![image_data]),
        ];

        let options = CompletionOptions {
            temperature: Some(0.0),
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
            "Vision OCR: {} chars recognised ({} in / {} out tokens)",
            response.content.len(),
            response.prompt_tokens,
            response.completion_tokens
        );

        progress(1.0);
        Ok(response.content)
    }
}
