//! CLI binary for docfields.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, dispatches to the right extraction flow, and prints
//! or exports the result.

use anyhow::{Context, Result};
use clap::Parser;
use docfields::{
    extract, extract_document, extract_structured, DocumentKind, ExtractionConfig,
    ExtractionConfigBuilder, ExtractionOutput, ExtractionSchema, PageSelection,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Free-form extraction (stdout)
  docfields invoice.pdf -p "Extract the invoice number and total"

  # Schema-constrained extraction
  docfields invoice.pdf -s schema.json

  # Typed OCR pipeline with automatic document-type detection
  docfields scan.png --ocr

  # Typed OCR pipeline, known type, CSV export
  docfields facture.pdf -t invoice --csv -o facture.csv

  # Specific pages at higher resolution
  docfields report.pdf --pages 0,2-4 --dpi 300 -p "List the section titles"

  # Offline demo without credentials
  docfields invoice.pdf -t invoice --mock

PAGE SELECTORS (0-indexed):
  0,2,5      those pages          1-4       pages 1 through 4 inclusive
  0,2-4,7    mixed                all       every page (default)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          API key for the public endpoint
  GOOGLE_CLOUD_PROJECT    Vertex project ID
  GOOGLE_CLOUD_LOCATION   Vertex region (default europe-west1)
  GOOGLE_VERTEX_TOKEN     OAuth bearer token for Vertex mode
                          (gcloud auth print-access-token)

SETUP:
  1. export GEMINI_API_KEY=...        (or --project + GOOGLE_VERTEX_TOKEN)
  2. docfields document.pdf -s schema.json
  OCR mode additionally needs the tesseract binary on PATH.
"#;

/// Extract structured fields and free text from documents using vision LLMs and OCR.
#[derive(Parser, Debug)]
#[command(
    name = "docfields",
    version,
    about = "Extract structured fields and free text from documents using vision LLMs and OCR",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document path (PDF or image: png, jpg, jpeg, tiff, tif, bmp).
    input: PathBuf,

    /// Free-form extraction prompt.
    #[arg(short, long, conflicts_with_all = ["schema", "doc_type", "ocr"])]
    prompt: Option<String>,

    /// JSON file with the extraction schema (field name → description).
    #[arg(short, long, conflicts_with_all = ["doc_type", "ocr"])]
    schema: Option<PathBuf>,

    /// Document type for the OCR pipeline: invoice, contract, generic.
    #[arg(short = 't', long = "type", value_name = "KIND")]
    doc_type: Option<KindArg>,

    /// Use the OCR pipeline with automatic type detection.
    #[arg(long)]
    ocr: bool,

    /// Page selection: all, 0,2,5 or 1-4 (0-indexed).
    #[arg(long, env = "DOCFIELDS_PAGES")]
    pages: Option<String>,

    /// Rendering DPI (72–400).
    #[arg(long, env = "DOCFIELDS_DPI")]
    dpi: Option<u32>,

    /// Google Cloud project ID (Vertex mode).
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    project: Option<String>,

    /// Vertex AI region.
    #[arg(long, env = "GOOGLE_CLOUD_LOCATION")]
    location: Option<String>,

    /// Model identifier.
    #[arg(long, env = "DOCFIELDS_MODEL")]
    model: Option<String>,

    /// API key for the public generative-language endpoint.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Use the offline mock model (no credentials needed).
    #[arg(long)]
    mock: bool,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the result to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export as CSV instead of JSON (structured results).
    #[arg(long)]
    csv: bool,

    /// OCR language(s), e.g. eng, fra, fra+eng.
    #[arg(long, env = "DOCFIELDS_OCR_LANG")]
    lang: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum model output tokens.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Invoice,
    Contract,
    Generic,
}

impl From<KindArg> for DocumentKind {
    fn from(v: KindArg) -> Self {
        match v {
            KindArg::Invoice => DocumentKind::Invoice,
            KindArg::Contract => DocumentKind::Contract,
            KindArg::Generic => DocumentKind::Generic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Spinner while the pipeline runs ──────────────────────────────────
    let spinner = if cli.quiet {
        None
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("Extracting from {}…", cli.input.display()));
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    };

    // ── Dispatch ─────────────────────────────────────────────────────────
    let result = run(&cli, &config).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let output = result?;

    // ── Render / export ──────────────────────────────────────────────────
    if let Some(ref path) = cli.output {
        if cli.csv {
            output.write_csv(path).await?;
        } else {
            output.write_json(path).await?;
        }
        if !cli.quiet {
            eprintln!(
                "{} {} ({} pages, {}ms)  →  {}",
                green("✔"),
                output.kind,
                output.stats.selected_pages,
                output.stats.total_ms,
                bold(&path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        let rendered = if cli.csv {
            output.to_csv_string()
        } else if let Some(text) = output.data.as_text() {
            format!("{}\n", text.trim_end())
        } else {
            format!("{}\n", output.data_json_string()?)
        };
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;

        if !cli.quiet {
            eprintln!(
                "{}",
                dim(&format!(
                    "{} · {}/{} pages · render {}ms{} · model {}ms · total {}ms",
                    output.kind,
                    output.stats.selected_pages,
                    output.stats.total_pages,
                    output.stats.render_ms,
                    output
                        .stats
                        .ocr_ms
                        .map(|ms| format!(" · ocr {}ms", ms))
                        .unwrap_or_default(),
                    output.stats.model_ms,
                    output.stats.total_ms,
                ))
            );
        }
    }

    Ok(())
}

/// Run the extraction flow selected by the flags.
async fn run(cli: &Cli, config: &ExtractionConfig) -> Result<ExtractionOutput> {
    if let Some(ref schema_path) = cli.schema {
        let schema = ExtractionSchema::from_file(schema_path)
            .with_context(|| format!("Failed to load schema {:?}", schema_path))?;
        return extract_structured(&cli.input, &schema, config)
            .await
            .context("Structured extraction failed");
    }

    if cli.ocr || cli.doc_type.is_some() {
        let kind = cli.doc_type.map(DocumentKind::from);
        return extract_document(&cli.input, kind, config)
            .await
            .context("Document extraction failed");
    }

    let prompt = cli
        .prompt
        .clone()
        .unwrap_or_else(|| docfields::prompts::DEFAULT_PROMPT.to_string());
    extract(&cli.input, &prompt, config)
        .await
        .context("Extraction failed")
}

/// Map CLI flags to `ExtractionConfig`, layering file config under flags.
fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder: ExtractionConfigBuilder = if let Some(ref path) = cli.config {
        ExtractionConfig::from_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?
    } else {
        ExtractionConfig::builder()
    };

    if let Some(dpi) = cli.dpi {
        builder = builder.dpi(dpi);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model_name(model);
    }
    if let Some(ref project) = cli.project {
        builder = builder.project_id(project);
    }
    if let Some(ref location) = cli.location {
        builder = builder.location(location);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if cli.mock {
        builder = builder.use_mock(true);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(ref lang) = cli.lang {
        builder = builder.ocr_lang(lang);
    }
    if let Some(ref pages) = cli.pages {
        builder = builder.pages(PageSelection::parse(pages)?);
    }

    builder.build().context("Invalid configuration")
}
