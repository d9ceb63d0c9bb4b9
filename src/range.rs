//! Page-range resolution: user-facing spec string → validated 1-indexed range.
//!
//! The spec string grammar comes from the upload dialog: the literal `all`
//! (or an empty string) selects the whole document, and `A-B` selects the
//! (A+1)-th through (B+1)-th pages — the dialog numbers pages from zero.
//! Resolution is a pure function; it runs before any rendering work so a bad
//! range fails fast instead of after minutes of OCR.

use crate::error::OkumaError;
use once_cell::sync::Lazy;
use regex::Regex;

/// A validated, 1-indexed, inclusive page range.
///
/// Invariant: `1 <= start <= end <= total_pages` of the document it was
/// resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    /// Number of pages covered by the range. Always at least one.
    pub fn page_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// Iterate the covered 1-indexed page numbers in ascending order.
    pub fn pages(&self) -> impl Iterator<Item = usize> {
        self.start..=self.end
    }
}

static RE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)-(\d+)$").unwrap());

/// Resolve a user-facing range spec against the document's page count.
///
/// * `""` or `"all"` → the whole document.
/// * `"A-B"` with 0-indexed integers → `{A+1, min(B+1, total_pages)}`.
///
/// Any other shape, a start beyond the last page, or a start past the end
/// is [`OkumaError::InvalidRange`].
pub fn resolve_range(spec: &str, total_pages: usize) -> Result<PageRange, OkumaError> {
    let invalid = || OkumaError::InvalidRange {
        spec: spec.to_string(),
        total_pages,
    };

    if total_pages == 0 {
        return Err(invalid());
    }

    let trimmed = spec.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(PageRange {
            start: 1,
            end: total_pages,
        });
    }

    let caps = RE_RANGE.captures(trimmed).ok_or_else(invalid)?;
    let a: usize = caps[1].parse().map_err(|_| invalid())?;
    let b: usize = caps[2].parse().map_err(|_| invalid())?;

    let start = a + 1;
    let end = (b + 1).min(total_pages);

    if start > total_pages || start > end {
        return Err(invalid());
    }

    Ok(PageRange { start, end })
}
