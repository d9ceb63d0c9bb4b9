//! Error types for the okuma-cards library.
//!
//! Every failure category a caller needs to distinguish gets its own variant:
//! a UI prompting the user to fix a page range must not receive the same error
//! as one telling them the PDF could not be opened. For the same reason there
//! is no generic "something went wrong" variant covering the card-generation
//! taxonomy — only [`OkumaError::Internal`] for genuinely unexpected states
//! (task panics, tempfile failures).
//!
//! Stage failures propagate unchanged to the caller of
//! [`crate::generate::generate_cards`]: extraction errors are never re-wrapped
//! as segmentation errors, and nothing in this crate retries internally.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the okuma-cards library.
#[derive(Debug, Error)]
pub enum OkumaError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// The PDF resource could not be opened or read. Non-retryable without
    /// a fresh URL or path.
    #[error("Could not open document: {detail}")]
    SourceUnavailable { detail: String },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The supplied page-range specification is malformed or out of bounds.
    /// Caller-correctable: fix the spec string and call again.
    #[error("Invalid page range '{spec}' for a {total_pages}-page document")]
    InvalidRange { spec: String, total_pages: usize },

    /// Rasterisation failed for a specific page. Aborts the whole extraction;
    /// a partial document is unusable for ordered segmentation.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The OCR engine failed on a specific page. Aborts the whole extraction.
    #[error("OCR failed for page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// Extraction (or direct input) yielded fewer than 10 usable characters
    /// after normalisation. Callers should ask the user for manual input
    /// rather than retry automatically.
    #[error("Insufficient text extracted from document ({len} chars after cleanup)")]
    InsufficientText { len: usize },

    /// Neither inline text nor a PDF URL produced usable content. Raised
    /// before any network or OCR cost is incurred.
    #[error("No content to analyze: supply document text or a PDF file")]
    NoContent,

    // ── Segmentation errors ───────────────────────────────────────────────
    /// The generative response could not be parsed under the selected
    /// contract (malformed JSON, missing `cards`, zero sections after the
    /// delimiter split). Never silently falls back to a naive paragraph
    /// split — that would discard the "preserve original wording" guarantee.
    #[error("Segmentation response violated the {contract} contract: {detail}")]
    ContractViolation {
        contract: &'static str,
        detail: String,
    },

    /// The generative text service returned an error.
    #[error("Completion service error: {message}")]
    CompletionFailed { message: String },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Quota errors ──────────────────────────────────────────────────────
    /// The user's daily token quota is exhausted. Signalled before any
    /// generative call is attempted, never as a parse-time failure.
    #[error("Daily AI token quota exhausted for user '{user_id}'")]
    QuotaExceeded { user_id: String },

    // ── Persistence errors ────────────────────────────────────────────────
    /// The card store rejected the generated cards.
    #[error("Failed to persist reading cards: {detail}")]
    StoreFailed { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OkumaError {
    /// True for errors the caller can fix by correcting their input
    /// (range spec, missing content) rather than by retrying.
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self,
            OkumaError::InvalidRange { .. }
                | OkumaError::NoContent
                | OkumaError::InsufficientText { .. }
        )
    }
}
