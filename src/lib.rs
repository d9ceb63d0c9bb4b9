//! # okuma-cards
//!
//! Turn documents into ordered Turkish reading/study cards using OCR and LLM
//! segmentation.
//!
//! ## Why this crate?
//!
//! Study-card apps need document text split into digestible, titled cards —
//! but classic PDF text extraction fails on scanned books, and naive
//! paragraph splitting produces cards that cut arguments in half. Instead
//! this crate rasterises each page, transcribes it with a vision model, and
//! asks an LLM to segment the text along its semantic boundaries, returning
//! cards whose order always matches the source document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! text or PDF
//!  │
//!  ├─ 1. Source   inline text wins; otherwise resolve local file / URL
//!  ├─ 2. Range    parse the page-range spec against the real page count
//!  ├─ 3. Render   rasterise one page at a time via pdfium (spawn_blocking)
//!  ├─ 4. OCR      transcribe each page, strictly in order
//!  ├─ 5. Segment  one LLM call splits the text into `=== KART n ===` blocks
//!  └─ 6. Cards    parsed, titled, numbered after any existing cards
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use okuma_cards::{
//!     generate_cards, resolve_provider, CardSource, GenerationConfig,
//!     LlmCompletionService, VisionOcrEngine,
//! };
//! use okuma_cards::progress::noop_sink;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / environment
//!     let config = GenerationConfig::default();
//!     let provider = resolve_provider(&config)?;
//!     let engine = VisionOcrEngine::new(Arc::clone(&provider));
//!     let completions = LlmCompletionService::new(provider, config.temperature, config.max_tokens);
//!
//!     let source = CardSource::from_pdf("kitap.pdf");
//!     let out = generate_cards(&source, &engine, &completions, &config, &noop_sink(), 0).await?;
//!     for card in &out.cards {
//!         println!("## {}\n{}\n", card.title, card.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `okuma` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding only the library:
//! ```toml
//! okuma-cards = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cards;
pub mod completion;
pub mod config;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod range;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cards::{parse_response, Card, ResponseContract};
pub use completion::{resolve_provider, Completion, CompletionService, LlmCompletionService};
pub use config::{GenerationConfig, GenerationConfigBuilder};
pub use error::OkumaError;
pub use generate::{generate_and_store, generate_cards, CardSource, GeneratedCards};
pub use pipeline::extract::{extract_text, extract_text_with, MIN_TEXT_LEN};
pub use pipeline::ocr::{OcrEngine, VisionOcrEngine};
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use progress::{OcrProgress, ProgressSink};
pub use prompts::{build_request, PromptVariant, SegmentOptions, SegmentationRequest};
pub use range::{resolve_range, PageRange};
pub use store::{CardStore, NewCard, QuotaGate, UnlimitedQuota};
