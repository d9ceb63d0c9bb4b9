//! The card-generation orchestrator.
//!
//! A linear state machine with no branching back:
//!
//! ```text
//! START → RESOLVE_SOURCE → (EXTRACT if PDF and no text) → SEGMENT → RETURN
//! ```
//!
//! Inline text wins over a PDF: the common "plain document" path must never
//! pay for OCR. Extraction failures propagate verbatim — callers need to
//! distinguish "could not read the PDF" from "could not segment the text" —
//! and a successful run has no side effects beyond progress-sink emissions;
//! persistence and quota accounting live in [`generate_and_store`], which
//! delegates both to collaborator traits.

use crate::cards::{parse_response, Card};
use crate::completion::CompletionService;
use crate::config::GenerationConfig;
use crate::error::OkumaError;
use crate::pipeline::extract::{extract_text, MIN_TEXT_LEN};
use crate::pipeline::input::resolve_input;
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressSink;
use crate::prompts::{build_request, SegmentOptions};
use crate::store::{CardStore, NewCard, QuotaGate};
use tracing::{debug, info};

/// What to generate cards from. Inline text takes precedence over the PDF
/// when both are present and the text is non-trivial.
#[derive(Debug, Clone, Default)]
pub struct CardSource {
    /// Document text, if the document was authored or pasted as text.
    pub text: Option<String>,
    /// Local path or HTTP/HTTPS URL of a PDF to extract from.
    pub pdf_url: Option<String>,
}

impl CardSource {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn from_pdf(url: impl Into<String>) -> Self {
        Self {
            pdf_url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// A successful generation: the ordered cards plus the token usage the quota
/// collaborator is told about.
#[derive(Debug, Clone)]
pub struct GeneratedCards {
    pub cards: Vec<Card>,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Generate reading cards from a document source.
///
/// `prior_card_count` is the number of cards already persisted for the target
/// document; it keeps synthesised `Kart <n>` titles monotonic across repeated
/// invocations. Callers without persistence pass 0.
///
/// Never returns an empty card list: zero parsed cards is always a
/// [`OkumaError::ContractViolation`].
pub async fn generate_cards(
    source: &CardSource,
    engine: &dyn OcrEngine,
    completions: &dyn CompletionService,
    config: &GenerationConfig,
    sink: &ProgressSink,
    prior_card_count: usize,
) -> Result<GeneratedCards, OkumaError> {
    // ── Resolve source ───────────────────────────────────────────────────
    let text = resolve_source(source, engine, config, sink).await?;
    debug!("Segmenting {} chars of source text", text.chars().count());

    // ── Segment ──────────────────────────────────────────────────────────
    let options = SegmentOptions {
        variant: config.prompt.clone(),
        contract: config.contract,
        page_range_hint: config.page_range.clone(),
    };
    let request = build_request(&text, &options);
    let completion = completions.complete(&request).await?;
    let cards = parse_response(&completion.content, config.contract, prior_card_count)?;

    info!("Generated {} reading cards", cards.len());
    Ok(GeneratedCards {
        cards,
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
    })
}

/// Pick the text to segment: non-trivial inline text, else PDF extraction,
/// else fail before any network or OCR cost.
async fn resolve_source(
    source: &CardSource,
    engine: &dyn OcrEngine,
    config: &GenerationConfig,
    sink: &ProgressSink,
) -> Result<String, OkumaError> {
    if let Some(ref text) = source.text {
        let trimmed = text.trim();
        if trimmed.chars().count() > MIN_TEXT_LEN {
            debug!("Using inline text; skipping extraction");
            return Ok(trimmed.to_string());
        }
    }

    if let Some(ref url) = source.pdf_url {
        let resolved = resolve_input(url, config.download_timeout_secs).await?;
        return extract_text(resolved.path(), engine, config, sink).await;
    }

    Err(OkumaError::NoContent)
}

/// Generate cards and hand them to the persistence and quota collaborators.
///
/// The quota gate is consulted before any generative work (extraction may
/// itself burn tokens on a vision engine); the store supplies the count of
/// existing cards so ordering and numbering continue where the document left
/// off; usage is recorded post-hoc from the completion's token counts.
#[allow(clippy::too_many_arguments)]
pub async fn generate_and_store(
    source: &CardSource,
    engine: &dyn OcrEngine,
    completions: &dyn CompletionService,
    store: &dyn CardStore,
    quota: &dyn QuotaGate,
    document_id: &str,
    user_id: &str,
    config: &GenerationConfig,
    sink: &ProgressSink,
) -> Result<GeneratedCards, OkumaError> {
    if !quota.has_quota(user_id).await? {
        return Err(OkumaError::QuotaExceeded {
            user_id: user_id.to_string(),
        });
    }

    let prior = store.card_count(document_id).await?;
    let generated = generate_cards(source, engine, completions, config, sink, prior).await?;

    let records: Vec<NewCard> = generated
        .cards
        .iter()
        .enumerate()
        .map(|(i, card)| NewCard::from_card(card.clone(), document_id, user_id, prior + i))
        .collect();

    store.insert_cards(&records).await?;
    info!(
        "Stored {} cards for document '{}' starting at order {}",
        records.len(),
        document_id,
        prior
    );

    quota
        .record_usage(user_id, generated.input_tokens + generated.output_tokens)
        .await?;

    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Completion;
    use crate::progress::noop_sink;
    use crate::prompts::SegmentationRequest;
    use async_trait::async_trait;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PanickingEngine;

    #[async_trait]
    impl OcrEngine for PanickingEngine {
        async fn recognize(
            &self,
            _image: &DynamicImage,
            _language: &str,
            _progress: crate::pipeline::ocr::OcrProgressFn<'_>,
        ) -> Result<String, OkumaError> {
            panic!("extraction must not run for inline text sources");
        }
    }

    struct CannedCompletions {
        body: String,
        calls: AtomicUsize,
    }

    impl CannedCompletions {
        fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionService for CannedCompletions {
        async fn complete(
            &self,
            _request: &SegmentationRequest,
        ) -> Result<Completion, OkumaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Completion {
                content: self.body.clone(),
                input_tokens: 100,
                output_tokens: 50,
            })
        }
    }

    #[tokio::test]
    async fn inline_text_skips_extraction_even_with_pdf_present() {
        let source = CardSource {
            text: Some("Bu metin yeterince uzun bir belge içeriğidir.".into()),
            pdf_url: Some("/tmp/ignored.pdf".into()),
        };
        let completions =
            CannedCompletions::new("=== KART 1 ===\nBu metin yeterince uzun bir belge içeriğidir.");
        let config = GenerationConfig::default();

        let out = generate_cards(
            &source,
            &PanickingEngine,
            &completions,
            &config,
            &noop_sink(),
            0,
        )
        .await
        .unwrap();

        assert_eq!(out.cards.len(), 1);
        assert_eq!(completions.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_source_fails_before_any_work() {
        let source = CardSource::default();
        let completions = CannedCompletions::new("unused");
        let config = GenerationConfig::default();

        let err = generate_cards(
            &source,
            &PanickingEngine,
            &completions,
            &config,
            &noop_sink(),
            0,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OkumaError::NoContent));
        assert_eq!(completions.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn trivial_text_without_pdf_is_no_content() {
        let source = CardSource::from_text("kısa");
        let completions = CannedCompletions::new("unused");
        let config = GenerationConfig::default();

        let err = generate_cards(
            &source,
            &PanickingEngine,
            &completions,
            &config,
            &noop_sink(),
            0,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OkumaError::NoContent));
    }
}
