//! Pipeline stages for document-to-cards extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap one
//! implementation (e.g. a different OCR engine) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr ──▶ extract
//! (URL/path) (pdfium)  (base64)  (engine) (loop + cleanup)
//! ```
//!
//! 1. [`input`]   — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]  — rasterise one page at a time; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`encode`]  — PNG-encode and base64-wrap a page image for vision APIs
//! 4. [`ocr`]     — the [`ocr::OcrEngine`] seam plus the built-in
//!    vision-model implementation
//! 5. [`extract`] — the per-page extraction loop: strictly sequential,
//!    progress-reporting, ending in text normalisation
pub mod encode;
pub mod extract;
pub mod input;
pub mod ocr;
pub mod render;
