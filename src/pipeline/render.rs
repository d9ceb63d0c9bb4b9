//! PDF rasterisation: render one page at a time to a `DynamicImage` via pdfium.
//!
//! ## The renderer seam
//!
//! Like OCR, rasterisation is a collaborator: the extraction loop only needs
//! "document bytes + page index in, page image out". [`PageRenderer`] is that
//! contract, and [`PdfiumRenderer`] is the shipped implementation. Tests
//! substitute a canned renderer so the loop runs without a native pdfium
//! library on the machine.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking thread pool
//! so Tokio workers never stall during CPU-heavy rendering.
//!
//! ## Why one page per call?
//!
//! Extraction is strictly sequential: page N+1's render must not begin until
//! page N's OCR has committed its text, because downstream segmentation
//! assumes an in-order text stream. Rendering a single page per call keeps
//! that sequencing at the call site instead of buffering a batch of images
//! that would invite reordering. The document is re-opened from an in-memory
//! byte buffer each time; pdfium parses lazily, so the reopen cost is dwarfed
//! by OCR time per page.

use crate::error::OkumaError;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Rasterisation over an in-memory PDF document.
///
/// `page_index` is 0-based; `scale` multiplies the page's native size.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document. Also the cheapest way to verify the
    /// document opens at all; any failure here is
    /// [`OkumaError::SourceUnavailable`].
    async fn page_count(&self, pdf_bytes: Arc<Vec<u8>>) -> Result<usize, OkumaError>;

    /// Rasterise a single page at `scale` times its native size.
    async fn render_page(
        &self,
        pdf_bytes: Arc<Vec<u8>>,
        page_index: usize,
        scale: f32,
    ) -> Result<DynamicImage, OkumaError>;
}

/// [`PageRenderer`] backed by the pdfium library.
pub struct PdfiumRenderer {
    lib_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    /// An explicit library path is a config value, not a module-level side
    /// effect, so embedding applications decide where the engine comes from.
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }
}

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn page_count(&self, pdf_bytes: Arc<Vec<u8>>) -> Result<usize, OkumaError> {
        let lib_path = self.lib_path.clone();
        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium(lib_path.as_deref())?;
            let document = pdfium
                .load_pdf_from_byte_slice(&pdf_bytes, None)
                .map_err(|e| OkumaError::SourceUnavailable {
                    detail: format!("{e:?}"),
                })?;
            Ok(document.pages().len() as usize)
        })
        .await
        .map_err(|e| OkumaError::Internal(format!("page-count task panicked: {e}")))?
    }

    async fn render_page(
        &self,
        pdf_bytes: Arc<Vec<u8>>,
        page_index: usize,
        scale: f32,
    ) -> Result<DynamicImage, OkumaError> {
        let lib_path = self.lib_path.clone();
        tokio::task::spawn_blocking(move || {
            render_page_blocking(&pdf_bytes, page_index, scale, lib_path.as_deref())
        })
        .await
        .map_err(|e| OkumaError::Internal(format!("render task panicked: {e}")))?
    }
}

/// Bind a pdfium instance, honouring an explicit library path when given.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, OkumaError> {
    match lib_path {
        Some(path) => {
            let bindings = Pdfium::bind_to_library(path)
                .map_err(|e| OkumaError::Internal(format!("pdfium binding failed: {e:?}")))?;
            Ok(Pdfium::new(bindings))
        }
        None => Ok(Pdfium::default()),
    }
}

fn render_page_blocking(
    pdf_bytes: &[u8],
    page_index: usize,
    scale: f32,
    lib_path: Option<&Path>,
) -> Result<DynamicImage, OkumaError> {
    let render_failed = |detail: String| OkumaError::RenderFailed {
        page: page_index + 1,
        detail,
    };

    let pdfium = bind_pdfium(lib_path)?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| OkumaError::SourceUnavailable {
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    if page_index >= pages.len() as usize {
        return Err(render_failed(format!(
            "page index out of range (document has {} pages)",
            pages.len()
        )));
    }

    let page = pages
        .get(page_index as u16)
        .map_err(|e| render_failed(format!("{e:?}")))?;

    // Native page size is in points; scaling the target width scales the
    // whole raster proportionally.
    let target_width = (page.width().value * scale).round() as i32;
    let render_config = PdfRenderConfig::new().set_target_width(target_width.max(1));

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| render_failed(format!("{e:?}")))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_index + 1,
        image.width(),
        image.height()
    );

    Ok(image)
}
