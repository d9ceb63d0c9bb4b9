//! Integration tests for the card-generation pipeline.
//!
//! Every external collaborator — OCR engine, completion service, card store,
//! quota gate — is replaced by an in-memory mock, so these tests exercise the
//! full orchestration (source resolution, request building, parsing,
//! persistence, quota accounting) without a network connection or a pdfium
//! library on the machine.

use async_trait::async_trait;
use image::DynamicImage;
use okuma_cards::pipeline::ocr::OcrProgressFn;
use okuma_cards::progress::noop_sink;
use okuma_cards::store::{CardStore, NewCard, QuotaGate};
use okuma_cards::{
    extract_text_with, generate_and_store, generate_cards, CardSource, Completion,
    CompletionService, GenerationConfig, OcrEngine, OcrProgress, OkumaError, PageRenderer,
    ProgressSink, ResponseContract, SegmentationRequest,
};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Mock collaborators ───────────────────────────────────────────────────────

/// OCR engine that returns canned page texts and counts invocations.
struct ScriptedEngine {
    pages: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    fn new(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn unused() -> Self {
        Self::new(&[])
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for ScriptedEngine {
    async fn recognize(
        &self,
        _image: &DynamicImage,
        _language: &str,
        progress: OcrProgressFn<'_>,
    ) -> Result<String, OkumaError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        progress(1.0);
        Ok(self.pages.get(n).cloned().unwrap_or_default())
    }
}

/// Completion service that replays a canned body and records each request.
struct ScriptedCompletions {
    body: String,
    requests: Mutex<Vec<SegmentationRequest>>,
}

impl ScriptedCompletions {
    fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> SegmentationRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletions {
    async fn complete(&self, request: &SegmentationRequest) -> Result<Completion, OkumaError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(Completion {
            content: self.body.clone(),
            input_tokens: 120,
            output_tokens: 80,
        })
    }
}

/// In-memory card store, optionally preloaded with existing cards.
#[derive(Default)]
struct MemoryStore {
    existing: usize,
    inserted: Mutex<Vec<NewCard>>,
}

impl MemoryStore {
    fn with_existing(existing: usize) -> Self {
        Self {
            existing,
            ..Default::default()
        }
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn card_count(&self, _document_id: &str) -> Result<usize, OkumaError> {
        Ok(self.existing + self.inserted.lock().unwrap().len())
    }

    async fn insert_cards(&self, cards: &[NewCard]) -> Result<(), OkumaError> {
        self.inserted.lock().unwrap().extend_from_slice(cards);
        Ok(())
    }
}

/// Renderer that hands back blank page images and records which page
/// indices were requested.
struct FlatRenderer {
    pages: usize,
    rendered: Mutex<Vec<usize>>,
}

impl FlatRenderer {
    fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            rendered: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PageRenderer for FlatRenderer {
    async fn page_count(&self, _pdf_bytes: Arc<Vec<u8>>) -> Result<usize, OkumaError> {
        Ok(self.pages)
    }

    async fn render_page(
        &self,
        _pdf_bytes: Arc<Vec<u8>>,
        page_index: usize,
        _scale: f32,
    ) -> Result<DynamicImage, OkumaError> {
        self.rendered.lock().unwrap().push(page_index);
        Ok(DynamicImage::new_rgba8(1, 1))
    }
}

/// A throwaway on-disk document for the extraction loop to read.
fn fixture_file() -> tempfile::NamedTempFile {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"%PDF-1.4 stub").unwrap();
    tmp
}

/// Sink that captures every event for sequence assertions.
fn capturing_sink() -> (ProgressSink, Arc<Mutex<Vec<OcrProgress>>>) {
    let events: Arc<Mutex<Vec<OcrProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&events);
    let sink: ProgressSink = Arc::new(move |e| captured.lock().unwrap().push(e));
    (sink, events)
}

/// Quota gate with a fixed answer that records reported usage.
struct FixedQuota {
    allow: bool,
    consulted: AtomicBool,
    recorded: AtomicUsize,
}

impl FixedQuota {
    fn allowing() -> Self {
        Self {
            allow: true,
            consulted: AtomicBool::new(false),
            recorded: AtomicUsize::new(0),
        }
    }

    fn denying() -> Self {
        Self {
            allow: false,
            consulted: AtomicBool::new(false),
            recorded: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QuotaGate for FixedQuota {
    async fn has_quota(&self, _user_id: &str) -> Result<bool, OkumaError> {
        self.consulted.store(true, Ordering::SeqCst);
        Ok(self.allow)
    }

    async fn record_usage(&self, _user_id: &str, tokens: usize) -> Result<(), OkumaError> {
        self.recorded.fetch_add(tokens, Ordering::SeqCst);
        Ok(())
    }
}

const LONG_TEXT: &str =
    "Okumak, zihni besleyen en eski alışkanlıktır. Her paragraf kendi bütünlüğünü taşır.";

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn extraction_joins_pages_in_source_order() {
    let engine = ScriptedEngine::new(&["Birinci sayfa.", "İkinci sayfa.", "Üçüncü sayfa."]);
    let renderer = FlatRenderer::with_pages(3);
    let config = GenerationConfig::default();
    let file = fixture_file();
    let (sink, events) = capturing_sink();

    let text = extract_text_with(file.path(), &renderer, &engine, &config, &sink)
        .await
        .unwrap();

    // Pages are joined left to right; normalisation collapses the blank-line
    // separators to single spaces without touching the order.
    assert_eq!(text, "Birinci sayfa. İkinci sayfa. Üçüncü sayfa.");
    assert_eq!(engine.call_count(), 3);
    assert_eq!(*renderer.rendered.lock().unwrap(), vec![0, 1, 2]);

    let events = events.lock().unwrap();
    assert_eq!(events.first(), Some(&OcrProgress::Loading));
    assert_eq!(events.last(), Some(&OcrProgress::Done { page: 3, total: 3 }));
    let render_pages: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            OcrProgress::Render { page, .. } => Some(*page),
            _ => None,
        })
        .collect();
    assert_eq!(render_pages, vec![1, 2, 3]);
}

#[tokio::test]
async fn extraction_below_ten_chars_is_insufficient_text() {
    // "abcd" + "efgh" normalise to "abcd efgh", nine characters.
    let engine = ScriptedEngine::new(&["abcd", "efgh"]);
    let renderer = FlatRenderer::with_pages(2);
    let config = GenerationConfig::default();
    let file = fixture_file();

    let err = extract_text_with(file.path(), &renderer, &engine, &config, &noop_sink())
        .await
        .unwrap_err();

    assert!(
        matches!(err, OkumaError::InsufficientText { len: 9 }),
        "got: {err}"
    );
}

#[tokio::test]
async fn extraction_of_exactly_ten_chars_passes_the_gate() {
    // "abcd" + "efghi" normalise to "abcd efghi", ten characters.
    let engine = ScriptedEngine::new(&["abcd", "efghi"]);
    let renderer = FlatRenderer::with_pages(2);
    let config = GenerationConfig::default();
    let file = fixture_file();

    let text = extract_text_with(file.path(), &renderer, &engine, &config, &noop_sink())
        .await
        .unwrap();
    assert_eq!(text, "abcd efghi");
}

#[tokio::test]
async fn extraction_honours_the_page_range() {
    let engine = ScriptedEngine::new(&["Seçilen ilk sayfa.", "Seçilen ikinci sayfa."]);
    let renderer = FlatRenderer::with_pages(5);
    let config = GenerationConfig::builder()
        .page_range("1-2")
        .build()
        .unwrap();
    let file = fixture_file();

    let text = extract_text_with(file.path(), &renderer, &engine, &config, &noop_sink())
        .await
        .unwrap();

    // 0-indexed "1-2" selects document pages 2 and 3.
    assert_eq!(*renderer.rendered.lock().unwrap(), vec![1, 2]);
    assert_eq!(engine.call_count(), 2);
    assert_eq!(text, "Seçilen ilk sayfa. Seçilen ikinci sayfa.");
}

#[tokio::test]
async fn invalid_range_fails_before_any_rendering() {
    let engine = ScriptedEngine::unused();
    let renderer = FlatRenderer::with_pages(3);
    let config = GenerationConfig::builder()
        .page_range("7-9")
        .build()
        .unwrap();
    let file = fixture_file();

    let err = extract_text_with(file.path(), &renderer, &engine, &config, &noop_sink())
        .await
        .unwrap_err();

    assert!(matches!(err, OkumaError::InvalidRange { .. }));
    assert!(renderer.rendered.lock().unwrap().is_empty());
    assert_eq!(engine.call_count(), 0);
}

// ── Generation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn cards_preserve_source_order() {
    let completions = ScriptedCompletions::new(
        "=== KART 1 ===\nBirinci bölüm\n=== KART 2 ===\nİkinci bölüm\n=== KART 3 ===\nÜçüncü bölüm",
    );
    let source = CardSource::from_text(LONG_TEXT);
    let config = GenerationConfig::default();

    let out = generate_cards(
        &source,
        &ScriptedEngine::unused(),
        &completions,
        &config,
        &noop_sink(),
        0,
    )
    .await
    .unwrap();

    let contents: Vec<&str> = out.cards.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, ["Birinci bölüm", "İkinci bölüm", "Üçüncü bölüm"]);
    let titles: Vec<&str> = out.cards.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["Kart 1", "Kart 2", "Kart 3"]);
}

#[tokio::test]
async fn inline_text_never_touches_the_ocr_engine() {
    let engine = ScriptedEngine::new(&["should never be read"]);
    let completions = ScriptedCompletions::new("=== KART 1 ===\niçerik");
    let source = CardSource {
        text: Some(LONG_TEXT.into()),
        pdf_url: Some("/tmp/some.pdf".into()),
    };
    let config = GenerationConfig::default();

    generate_cards(&source, &engine, &completions, &config, &noop_sink(), 0)
        .await
        .unwrap();

    assert_eq!(engine.call_count(), 0);
    assert_eq!(completions.call_count(), 1);
}

#[tokio::test]
async fn trivial_text_falls_through_to_the_pdf_and_its_errors() {
    // Text below the 10-character threshold is unusable, so the missing PDF
    // is attempted and its resolution error surfaces unchanged.
    let completions = ScriptedCompletions::new("unused");
    let source = CardSource {
        text: Some("çok kısa".into()),
        pdf_url: Some("/nonexistent/belge.pdf".into()),
    };
    let config = GenerationConfig::default();

    let err = generate_cards(
        &source,
        &ScriptedEngine::unused(),
        &completions,
        &config,
        &noop_sink(),
        0,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, OkumaError::FileNotFound { .. }), "got: {err}");
    assert_eq!(completions.call_count(), 0);
}

#[tokio::test]
async fn response_without_markers_is_a_contract_violation() {
    let completions = ScriptedCompletions::new("Maalesef bu metni bölümleyemedim.");
    let source = CardSource::from_text(LONG_TEXT);
    let config = GenerationConfig::default();

    let err = generate_cards(
        &source,
        &ScriptedEngine::unused(),
        &completions,
        &config,
        &noop_sink(),
        0,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, OkumaError::ContractViolation { .. }));
}

#[tokio::test]
async fn json_contract_parses_generator_titles() {
    let completions = ScriptedCompletions::new(
        r#"{"cards":[{"title":"Giriş","content":"Metin A"},{"title":"Sonuç","content":"Metin B"}]}"#,
    );
    let source = CardSource::from_text(LONG_TEXT);
    let config = GenerationConfig::builder()
        .contract(ResponseContract::Json)
        .build()
        .unwrap();

    let out = generate_cards(
        &source,
        &ScriptedEngine::unused(),
        &completions,
        &config,
        &noop_sink(),
        0,
    )
    .await
    .unwrap();

    assert_eq!(out.cards[0].title, "Giriş");
    assert_eq!(out.cards[1].title, "Sonuç");
    // The JSON instruction set must have been selected for the request.
    assert!(completions.last_request().system.contains("JSON"));
}

#[tokio::test]
async fn page_range_hint_reaches_the_request() {
    let completions = ScriptedCompletions::new("=== KART 1 ===\niçerik");
    let source = CardSource::from_text(LONG_TEXT);
    let config = GenerationConfig::builder()
        .page_range("0-4")
        .build()
        .unwrap();

    generate_cards(
        &source,
        &ScriptedEngine::unused(),
        &completions,
        &config,
        &noop_sink(),
        0,
    )
    .await
    .unwrap();

    let request = completions.last_request();
    assert!(request.system.contains("0-4"));
    assert!(request.user.contains(LONG_TEXT));
}

#[tokio::test]
async fn token_counts_come_from_the_completion() {
    let completions = ScriptedCompletions::new("=== KART 1 ===\niçerik");
    let source = CardSource::from_text(LONG_TEXT);
    let config = GenerationConfig::default();

    let out = generate_cards(
        &source,
        &ScriptedEngine::unused(),
        &completions,
        &config,
        &noop_sink(),
        0,
    )
    .await
    .unwrap();

    assert_eq!(out.input_tokens, 120);
    assert_eq!(out.output_tokens, 80);
}

// ── Persistence and quota ────────────────────────────────────────────────────

#[tokio::test]
async fn numbering_and_order_continue_after_existing_cards() {
    let completions =
        ScriptedCompletions::new("=== KART 1 ===\nYeni bölüm A\n=== KART 2 ===\nYeni bölüm B");
    let store = MemoryStore::with_existing(2);
    let quota = FixedQuota::allowing();
    let config = GenerationConfig::default();

    let out = generate_and_store(
        &CardSource::from_text(LONG_TEXT),
        &ScriptedEngine::unused(),
        &completions,
        &store,
        &quota,
        "doc-7",
        "user-1",
        &config,
        &noop_sink(),
    )
    .await
    .unwrap();

    assert_eq!(out.cards[0].title, "Kart 3");
    assert_eq!(out.cards[1].title, "Kart 4");

    let inserted = store.inserted.lock().unwrap();
    assert_eq!(inserted.len(), 2);
    assert_eq!(inserted[0].card_order, 2);
    assert_eq!(inserted[1].card_order, 3);
    assert_eq!(inserted[0].document_id, "doc-7");
    assert_eq!(inserted[0].user_id, "user-1");

    // Usage is the completion's combined token count.
    assert_eq!(quota.recorded.load(Ordering::SeqCst), 200);
}

#[tokio::test]
async fn exhausted_quota_blocks_before_any_generative_call() {
    let completions = ScriptedCompletions::new("unused");
    let store = MemoryStore::default();
    let quota = FixedQuota::denying();
    let config = GenerationConfig::default();

    let err = generate_and_store(
        &CardSource::from_text(LONG_TEXT),
        &ScriptedEngine::unused(),
        &completions,
        &store,
        &quota,
        "doc-1",
        "user-9",
        &config,
        &noop_sink(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, OkumaError::QuotaExceeded { .. }));
    assert!(quota.consulted.load(Ordering::SeqCst));
    assert_eq!(completions.call_count(), 0);
    assert!(store.inserted.lock().unwrap().is_empty());
    assert_eq!(quota.recorded.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_generation_stores_nothing_and_records_no_usage() {
    let completions = ScriptedCompletions::new("hiç kart yok burada");
    let store = MemoryStore::default();
    let quota = FixedQuota::allowing();
    let config = GenerationConfig::default();

    let err = generate_and_store(
        &CardSource::from_text(LONG_TEXT),
        &ScriptedEngine::unused(),
        &completions,
        &store,
        &quota,
        "doc-1",
        "user-1",
        &config,
        &noop_sink(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, OkumaError::ContractViolation { .. }));
    assert!(store.inserted.lock().unwrap().is_empty());
    assert_eq!(quota.recorded.load(Ordering::SeqCst), 0);
}
