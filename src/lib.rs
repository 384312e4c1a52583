//! # docfields
//!
//! Extract structured fields or free text from documents (PDFs and scans)
//! using a hosted vision-language model, with a local-OCR alternative.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Input    classify path as PDF or raster image, verify magic bytes
//!  ├─ 2. Render   rasterise selected pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode   PNG → base64 payloads
//!  ├─ 4. Model    ONE batched generateContent call: all page images, prompt last
//!  │        └─ or: tesseract OCR → typed text prompt → model
//!  └─ 5. Parse    strip code fences, parse JSON, typed invoice/contract models
//! ```
//!
//! Every call is an independent, stateless request/response cycle: no cache,
//! no retry, no persistence. Failures are fatal to the call and reported
//! through [`ExtractError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docfields::{extract_structured, ExtractionConfig, ExtractionSchema};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let schema = ExtractionSchema::from_value(json!({
//!         "invoice_number": "string or null",
//!         "total_incl_tax": "number or null"
//!     }))?;
//!     let output = extract_structured("invoice.pdf", &schema, &config).await?;
//!     println!("{}", output.data_json_string()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docfields` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, OcrSettings, PageSelection};
pub use error::ExtractError;
pub use extract::{classify, extract, extract_document, extract_structured};
pub use models::{Clause, Contract, ContractType, DocumentKind, Invoice, LineItem, Party};
pub use output::{ExtractedData, ExtractionOutput, ExtractionStats};
pub use pipeline::vlm::{GeminiClient, MockModel, VisionModel};
pub use schema::ExtractionSchema;
