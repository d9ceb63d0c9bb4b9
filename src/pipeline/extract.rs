//! The per-page extraction loop: PDF file → normalised plain text.
//!
//! Pages are processed strictly in ascending order — page N+1's render does
//! not begin until page N's OCR has committed its text — because the
//! downstream segmentation stage assumes an in-order text stream. Parallel
//! page processing would need a merge step that risks silently transposing
//! document sections.
//!
//! Failure semantics: any per-page render or OCR failure aborts the whole
//! extraction. A document with missing pages is unusable for ordered
//! segmentation, so there is no skip-and-continue mode and no internal retry;
//! retrying is a caller decision, typically gated on user action.

use crate::config::GenerationConfig;
use crate::error::OkumaError;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use crate::progress::{OcrProgress, ProgressSink};
use crate::range::resolve_range;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Extractions (and direct text input) below this many characters are
/// treated as "no usable text", never as an empty success.
pub const MIN_TEXT_LEN: usize = 10;

/// Extract plain text from the configured page range of a PDF file,
/// rasterising through pdfium.
pub async fn extract_text(
    pdf_path: &Path,
    engine: &dyn OcrEngine,
    config: &GenerationConfig,
    sink: &ProgressSink,
) -> Result<String, OkumaError> {
    let renderer = PdfiumRenderer::new(config.pdfium_lib_path.clone());
    extract_text_with(pdf_path, &renderer, engine, config, sink).await
}

/// Extract plain text using an explicit [`PageRenderer`].
///
/// Emits [`OcrProgress`] events through `sink` as it goes; `page`/`total`
/// positions are 1-based within the selected range. The accumulated text is
/// normalised before the minimum-length gate is applied, so a page full of
/// whitespace cannot sneak past it.
pub async fn extract_text_with(
    pdf_path: &Path,
    renderer: &dyn PageRenderer,
    engine: &dyn OcrEngine,
    config: &GenerationConfig,
    sink: &ProgressSink,
) -> Result<String, OkumaError> {
    sink(OcrProgress::Loading);

    let pdf_bytes = Arc::new(tokio::fs::read(pdf_path).await.map_err(|e| {
        OkumaError::SourceUnavailable {
            detail: format!("cannot read '{}': {e}", pdf_path.display()),
        }
    })?);

    let total_pages = renderer.page_count(Arc::clone(&pdf_bytes)).await?;
    info!("PDF has {} pages", total_pages);

    // Fail before any rendering work begins.
    let range = resolve_range(&config.page_range, total_pages)?;
    let range_size = range.page_count();
    debug!(
        "Extracting pages {}..={} of {}",
        range.start, range.end, total_pages
    );

    let mut full_text = String::new();

    for (position, page_num) in range.pages().enumerate() {
        let page_in_range = position + 1;
        sink(OcrProgress::Render {
            page: page_in_range,
            total: range_size,
        });

        let image = renderer
            .render_page(Arc::clone(&pdf_bytes), page_num - 1, config.ocr_scale)
            .await?;

        sink(OcrProgress::Ocr {
            page: page_in_range,
            total: range_size,
            progress: 0.0,
        });

        let ocr_sink = Arc::clone(sink);
        let on_progress = move |p: f32| {
            ocr_sink(OcrProgress::Ocr {
                page: page_in_range,
                total: range_size,
                progress: p.clamp(0.0, 1.0),
            });
        };

        let page_text = engine
            .recognize(&image, &config.language, &on_progress)
            .await
            .map_err(|e| match e {
                // Engines don't know which page they're on; tag it here.
                OkumaError::OcrFailed { .. } => e,
                other => OkumaError::OcrFailed {
                    page: page_num,
                    detail: other.to_string(),
                },
            })?;

        let page_text = page_text.trim();
        if !page_text.is_empty() {
            if !full_text.is_empty() {
                full_text.push_str("\n\n");
            }
            full_text.push_str(page_text);
        }
        debug!("Page {}: {} chars recognised", page_num, page_text.len());
    }

    sink(OcrProgress::Done {
        page: range_size,
        total: range_size,
    });

    let cleaned = normalize_text(&full_text);
    let len = cleaned.chars().count();
    if len < MIN_TEXT_LEN {
        return Err(OkumaError::InsufficientText { len });
    }

    info!("Extracted {} chars from {} pages", len, range_size);
    Ok(cleaned)
}

static RE_TABS_CRS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t\r]+").unwrap());
static RE_WS_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Normalise recognised text: NUL bytes become spaces, tab/CR runs collapse
/// to one space, any remaining run of 2+ whitespace collapses to one space,
/// ends trimmed.
pub fn normalize_text(text: &str) -> String {
    let no_nul = text.replace('\u{0000}', " ");
    let no_tabs = RE_TABS_CRS.replace_all(&no_nul, " ");
    let collapsed = RE_WS_RUNS.replace_all(&no_tabs, " ");
    collapsed.trim().to_string()
}
