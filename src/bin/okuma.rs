//! CLI binary for okuma-cards.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig` and prints the generated cards.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use okuma_cards::{
    generate_cards, resolve_provider, CardSource, GenerationConfig, LlmCompletionService,
    OcrProgress, ProgressSink, PromptVariant, ResponseContract, VisionOcrEngine,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate cards from a PDF (stdout, Markdown)
  okuma kitap.pdf

  # Cards from a URL, only document pages 0-4, written to a file
  okuma https://example.com/ders.pdf --pages 0-4 -o kartlar.md

  # Cards from inline text (no OCR, no pdfium needed)
  okuma --text-file bolum1.txt

  # Structured titles (Ana Başlık / Alt Başlık) as JSON
  okuma kitap.pdf --prompt structured --json

  # Strict JSON response contract with a specific model
  okuma kitap.pdf --contract json --model gpt-4o-mini --provider openai

  # Continue numbering after 12 existing cards
  okuma kitap.pdf --start-index 12

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY        OpenAI API key (auto-detected)
  ANTHROPIC_API_KEY     Anthropic API key
  OKUMA_LLM_PROVIDER    Override provider (openai, anthropic, gemini, ollama)
  OKUMA_MODEL           Override model ID
  PDFIUM_LIB_PATH       Path to an existing libpdfium shared library

SETUP:
  1. Set API key:   export OPENAI_API_KEY=sk-...
  2. Generate:      okuma kitap.pdf -o kartlar.md
"#;

/// Generate Turkish reading/study cards from PDFs or text using OCR + LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "okuma",
    version,
    about = "Generate reading/study cards from PDFs or text using OCR and LLMs",
    long_about = "Generate ordered Turkish reading cards from a document. PDFs (local files or \
URLs) are rasterised page by page, transcribed with a vision model, and the text is segmented \
into titled cards by an LLM. Inline text skips OCR entirely.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL. Optional when --text/--text-file is given.
    input: Option<String>,

    /// Inline document text; skips PDF extraction when non-trivial.
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,

    /// Read document text from a file; skips PDF extraction when non-trivial.
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Write cards to this file instead of stdout.
    #[arg(short, long, env = "OKUMA_OUTPUT")]
    output: Option<PathBuf>,

    /// Page selection: "all" or a 0-indexed "A-B" range (e.g. 0-4).
    #[arg(long, env = "OKUMA_PAGES", default_value = "all")]
    pages: String,

    /// Segmentation style: default (semantic blocks) or structured (Ana Başlık / Alt Başlık).
    #[arg(long, env = "OKUMA_PROMPT", value_enum, default_value = "default")]
    prompt: PromptArg,

    /// Path to a text file containing custom segmentation instructions.
    #[arg(long, env = "OKUMA_SYSTEM_PROMPT")]
    prompt_file: Option<PathBuf>,

    /// Response contract the model is held to: delimited or json.
    #[arg(long, env = "OKUMA_CONTRACT", value_enum, default_value = "delimited")]
    contract: ContractArg,

    /// LLM model ID (e.g. gpt-4o-mini).
    #[arg(long, env = "OKUMA_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama.
    #[arg(long, env = "OKUMA_PROVIDER")]
    provider: Option<String>,

    /// OCR language code.
    #[arg(long, env = "OKUMA_LANGUAGE", default_value = "tur")]
    language: String,

    /// Page rasterisation scale factor (1.0–4.0).
    #[arg(long, env = "OKUMA_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "OKUMA_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens for the segmentation call.
    #[arg(long, env = "OKUMA_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// Number of cards that already exist for this document; numbering continues after it.
    #[arg(long, default_value_t = 0)]
    start_index: usize,

    /// Path to an existing libpdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "OKUMA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output cards as JSON instead of Markdown.
    #[arg(long, env = "OKUMA_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "OKUMA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OKUMA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the cards themselves.
    #[arg(short, long, env = "OKUMA_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PromptArg {
    Default,
    Structured,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ContractArg {
    Delimited,
    Json,
}

impl From<ContractArg> for ResponseContract {
    fn from(v: ContractArg) -> Self {
        match v {
            ContractArg::Delimited => ResponseContract::Delimited,
            ContractArg::Json => ResponseContract::Json,
        }
    }
}

/// Terminal progress: one bar fed by the extraction sink. OCR fractions are
/// folded into the bar position so a long page visibly advances.
fn progress_sink(bar: ProgressBar) -> ProgressSink {
    // Positions are tracked in permille so fractional OCR progress survives
    // the integer bar API.
    Arc::new(move |event| match event {
        OcrProgress::Loading => {
            bar.set_prefix("Loading");
            bar.set_message("Opening PDF…");
        }
        OcrProgress::Render { page, total } => {
            if bar.length().unwrap_or(0) != (total as u64) * 1000 {
                bar.set_length((total as u64) * 1000);
            }
            bar.set_prefix("Extracting");
            bar.set_message(format!("rendering page {page}/{total}"));
            bar.set_position(((page as u64) - 1) * 1000);
        }
        OcrProgress::Ocr {
            page,
            total,
            progress,
        } => {
            bar.set_message(format!("reading page {page}/{total}"));
            bar.set_position(((page as u64) - 1) * 1000 + (progress * 1000.0) as u64);
        }
        OcrProgress::Done { total, .. } => {
            bar.set_position((total as u64) * 1000);
            bar.finish_and_clear();
        }
    })
}

fn make_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {msg}  ⏱ {elapsed_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the interactive feedback; keep library logs
    // at error level unless explicitly verbose.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli).await?;

    let provider = resolve_provider(&config).context("No usable LLM provider")?;
    let engine = VisionOcrEngine::new(Arc::clone(&provider));
    let completions =
        LlmCompletionService::new(provider, config.temperature, config.max_tokens);

    // ── Resolve source ───────────────────────────────────────────────────
    let text = if let Some(ref path) = cli.text_file {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read text from {:?}", path))?,
        )
    } else {
        cli.text.clone()
    };

    if text.is_none() && cli.input.is_none() {
        anyhow::bail!("Nothing to read: give a PDF path/URL or --text/--text-file");
    }

    let source = CardSource {
        text,
        pdf_url: cli.input.clone(),
    };

    let sink: ProgressSink = if show_progress {
        progress_sink(make_bar())
    } else {
        okuma_cards::progress::noop_sink()
    };

    // ── Generate ─────────────────────────────────────────────────────────
    let out = generate_cards(
        &source,
        &engine,
        &completions,
        &config,
        &sink,
        cli.start_index,
    )
    .await
    .context("Card generation failed")?;

    // ── Output ───────────────────────────────────────────────────────────
    let rendered = if cli.json {
        let mut s =
            serde_json::to_string_pretty(&out.cards).context("Failed to serialise cards")?;
        s.push('\n');
        s
    } else {
        render_markdown(&out.cards)
    };

    if let Some(ref path) = cli.output {
        tokio::fs::write(path, &rendered)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        if !cli.quiet {
            eprintln!(
                "{} {} cards  →  {}",
                green("✔"),
                bold(&out.cards.len().to_string()),
                bold(&path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&out.input_tokens.to_string()),
            dim(&out.output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `GenerationConfig`.
async fn build_config(cli: &Cli) -> Result<GenerationConfig> {
    let prompt = if let Some(ref path) = cli.prompt_file {
        let custom = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        PromptVariant::Custom(custom)
    } else {
        match cli.prompt {
            PromptArg::Default => PromptVariant::Default,
            PromptArg::Structured => PromptVariant::Structured,
        }
    };

    let mut builder = GenerationConfig::builder()
        .language(&cli.language)
        .ocr_scale(cli.scale)
        .page_range(&cli.pages)
        .prompt(prompt)
        .contract(cli.contract.clone().into())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name);
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path);
    }

    builder.build().context("Invalid configuration")
}

/// Render cards as Markdown sections.
fn render_markdown(cards: &[okuma_cards::Card]) -> String {
    let mut out = String::new();
    for card in cards {
        out.push_str("## ");
        out.push_str(&card.title);
        out.push_str("\n\n");
        out.push_str(&card.content);
        out.push_str("\n\n");
    }
    out
}
