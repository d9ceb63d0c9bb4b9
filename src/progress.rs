//! Extraction progress events and the per-call sink that receives them.
//!
//! Progress is reported through an explicit sink passed to each extraction
//! call — there is no global progress registry and no implicit UI state, so
//! the pipeline works equally well behind a terminal progress bar, a
//! WebSocket, or a batch job that ignores progress entirely. Two concurrent
//! extractions never share a sink.
//!
//! Events are plain data, which keeps them trivially testable: a test can
//! capture everything emitted into a `Vec` behind a `Mutex` and assert on the
//! exact sequence.

use std::sync::Arc;

/// A progress event emitted during PDF text extraction.
///
/// `page` and `total` are 1-based positions *within the selected range*, not
/// absolute document page numbers: extracting pages 5–7 of a 40-page document
/// reports `page` 1..=3 of `total` 3.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrProgress {
    /// The PDF resource is being opened.
    Loading,
    /// A page is being rasterised.
    Render { page: usize, total: usize },
    /// OCR is running over a rasterised page; `progress` is 0..=1 for the
    /// current page only.
    Ocr {
        page: usize,
        total: usize,
        progress: f32,
    },
    /// All selected pages have been processed. `page` always equals `total`
    /// here; both are carried so consumers can treat this as the final
    /// position update.
    Done { page: usize, total: usize },
}

/// Per-call progress sink. Must be `Send + Sync`: rendering happens on a
/// blocking worker thread.
pub type ProgressSink = Arc<dyn Fn(OcrProgress) + Send + Sync>;

/// A sink that discards every event, for callers without a UI.
pub fn noop_sink() -> ProgressSink {
    Arc::new(|_| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn noop_sink_accepts_events() {
        let sink = noop_sink();
        sink(OcrProgress::Loading);
        sink(OcrProgress::Done { page: 3, total: 3 });
    }

    #[test]
    fn captured_events_preserve_order_and_payload() {
        let events: Arc<Mutex<Vec<OcrProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&events);
        let sink: ProgressSink = Arc::new(move |e| captured.lock().unwrap().push(e));

        sink(OcrProgress::Loading);
        sink(OcrProgress::Render { page: 1, total: 2 });
        sink(OcrProgress::Ocr {
            page: 1,
            total: 2,
            progress: 0.5,
        });
        sink(OcrProgress::Done { page: 2, total: 2 });

        let got = events.lock().unwrap();
        assert_eq!(got.len(), 4);
        assert_eq!(got[0], OcrProgress::Loading);
        assert_eq!(
            got[2],
            OcrProgress::Ocr {
                page: 1,
                total: 2,
                progress: 0.5
            }
        );
    }
}
