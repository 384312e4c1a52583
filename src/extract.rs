//! Orchestration: the entry points that sequence the pipeline stages.
//!
//! Three flows exist, all stateless and fully synchronous per call:
//!
//! * [`extract`] — free-form: rasterise → encode → one batched vision call →
//!   raw text.
//! * [`extract_structured`] — schema-constrained: same path with the JSON
//!   instruction appended and the reply parsed into a field map.
//! * [`extract_document`] — the OCR pipeline: rasterise → tesseract →
//!   classify (when no kind is given) → typed invoice/contract prompt →
//!   typed result.
//!
//! Multi-page documents go to the model as a **single batched request** (all
//! page images in one call) — latency is traded for per-call cost
//! predictability.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::models::{Contract, DocumentKind, Invoice};
use crate::output::{ExtractedData, ExtractionOutput, ExtractionStats};
use crate::pipeline::encode::{self, PagePayload};
use crate::pipeline::input::{self, DocumentFormat};
use crate::pipeline::ocr::TesseractOcr;
use crate::pipeline::render::{self, PageImage};
use crate::pipeline::vlm::{self, VisionModel};
use crate::prompts;
use crate::schema::ExtractionSchema;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Free-form extraction: send the selected page images and the caller's
/// prompt, return the model's text as-is.
pub async fn extract(
    input: impl AsRef<Path>,
    prompt: &str,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    let model = vlm::resolve_model(config)?;

    let loaded = load_pages(input.as_ref(), config).await?;
    let payloads = encode_pages(&loaded.pages)?;

    let model_start = Instant::now();
    let text = model.generate(&payloads, prompt).await?;
    let model_ms = model_start.elapsed().as_millis() as u64;

    info!(
        "Free-form extraction done: {} pages, {} chars",
        payloads.len(),
        text.len()
    );

    Ok(ExtractionOutput {
        kind: DocumentKind::Generic,
        data: ExtractedData::Text(text),
        stats: loaded.stats(model_ms, None, total_start),
    })
}

/// Schema-constrained extraction: augment the prompt with the JSON
/// instruction, strip fences, and parse the reply into a field map.
pub async fn extract_structured(
    input: impl AsRef<Path>,
    schema: &ExtractionSchema,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    let model = vlm::resolve_model(config)?;

    let loaded = load_pages(input.as_ref(), config).await?;
    let payloads = encode_pages(&loaded.pages)?;

    let prompt = prompts::structured_prompt(schema);
    let model_start = Instant::now();
    let raw = model.generate(&payloads, &prompt).await?;
    let model_ms = model_start.elapsed().as_millis() as u64;

    let fields = crate::pipeline::postprocess::parse_structured(&raw, schema)?;
    info!(
        "Structured extraction done: {}/{} schema fields returned",
        fields.len(),
        schema.len()
    );

    Ok(ExtractionOutput {
        kind: DocumentKind::Generic,
        data: ExtractedData::Fields(fields),
        stats: loaded.stats(model_ms, None, total_start),
    })
}

/// Full document pipeline over OCR text: rasterise, run the local engine,
/// classify when no kind is given, then run the typed extraction prompt.
///
/// `DocumentKind::Generic` (given or classified) returns the raw OCR text —
/// there is no dedicated prompt for it.
pub async fn extract_document(
    input: impl AsRef<Path>,
    kind: Option<DocumentKind>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    let model = vlm::resolve_model(config)?;

    let loaded = load_pages(input.as_ref(), config).await?;

    let ocr = TesseractOcr::new(config.ocr.clone());
    let ocr_result = ocr.extract_from_images(&loaded.pages).await?;
    let ocr_ms = ocr_result.duration_ms;

    let kind = match kind {
        Some(k) => k,
        None => {
            let detected = classify(&ocr_result.text, model.as_ref()).await;
            info!("Detected document type: {}", detected);
            detected
        }
    };

    let model_start = Instant::now();
    let data = match kind {
        DocumentKind::Invoice => {
            let text = non_empty_text(&ocr_result.text, "invoice extraction")?;
            let raw = model.generate(&[], &prompts::invoice_prompt(text)).await?;
            let fields =
                crate::pipeline::postprocess::parse_structured(&raw, &ExtractionSchema::invoice())?;
            ExtractedData::Invoice(Invoice::from_json(&fields))
        }
        DocumentKind::Contract => {
            let text = non_empty_text(&ocr_result.text, "contract extraction")?;
            let raw = model.generate(&[], &prompts::contract_prompt(text)).await?;
            let fields = crate::pipeline::postprocess::parse_structured(
                &raw,
                &ExtractionSchema::contract(),
            )?;
            ExtractedData::Contract(Contract::from_json(&fields))
        }
        DocumentKind::Generic => ExtractedData::Text(ocr_result.text.clone()),
    };
    let model_ms = model_start.elapsed().as_millis() as u64;

    info!(
        "Document extraction done: kind={}, {} OCR words",
        kind, ocr_result.word_count
    );

    Ok(ExtractionOutput {
        kind,
        data,
        stats: loaded.stats(model_ms, Some(ocr_ms), total_start),
    })
}

/// Ask the model for the document type. An empty text or a failed call is
/// [`DocumentKind::Generic`] — classification is advisory, never fatal.
pub async fn classify(text: &str, model: &dyn VisionModel) -> DocumentKind {
    if text.trim().is_empty() {
        return DocumentKind::Generic;
    }
    match model
        .generate(&[], &prompts::classification_prompt(text))
        .await
    {
        Ok(label) => DocumentKind::from_label(&label),
        Err(e) => {
            warn!("Classification failed, treating as generic: {}", e);
            DocumentKind::Generic
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

struct LoadedPages {
    total_pages: usize,
    pages: Vec<PageImage>,
    render_ms: u64,
}

impl LoadedPages {
    fn stats(
        &self,
        model_ms: u64,
        ocr_ms: Option<u64>,
        total_start: Instant,
    ) -> ExtractionStats {
        ExtractionStats {
            total_pages: self.total_pages,
            selected_pages: self.pages.len(),
            render_ms: self.render_ms,
            ocr_ms,
            model_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        }
    }
}

/// Resolve the input and produce the selected page images, in page order.
///
/// A zero-page PDF or a selection matching nothing yields an empty page list
/// without error.
async fn load_pages(
    path: &Path,
    config: &ExtractionConfig,
) -> Result<LoadedPages, ExtractError> {
    let resolved = input::resolve_input(path)?;
    let render_start = Instant::now();

    let (total_pages, pages) = match resolved.format {
        DocumentFormat::Pdf => {
            let total = render::page_count(&resolved.path).await?;
            let indices = config.pages.to_indices(total);
            debug!("Selected {}/{} pages", indices.len(), total);
            let pages = render::render_pages(&resolved.path, config, &indices).await?;
            (total, pages)
        }
        DocumentFormat::Image => {
            let img =
                image::open(&resolved.path).map_err(|e| ExtractError::ImageDecodeFailed {
                    path: resolved.path.clone(),
                    detail: e.to_string(),
                })?;
            let pages = if config.pages.to_indices(1).is_empty() {
                Vec::new()
            } else {
                vec![PageImage {
                    index: 0,
                    image: img,
                }]
            };
            (1, pages)
        }
    };

    Ok(LoadedPages {
        total_pages,
        pages,
        render_ms: render_start.elapsed().as_millis() as u64,
    })
}

fn encode_pages(pages: &[PageImage]) -> Result<Vec<PagePayload>, ExtractError> {
    pages
        .iter()
        .map(|p| encode::encode_page(p.index, &p.image))
        .collect()
}

fn non_empty_text<'a>(
    text: &'a str,
    stage: &'static str,
) -> Result<&'a str, ExtractError> {
    if text.trim().is_empty() {
        return Err(ExtractError::EmptyDocument { stage });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::vlm::MockModel;

    #[tokio::test]
    async fn classify_empty_text_is_generic() {
        assert_eq!(classify("   ", &MockModel).await, DocumentKind::Generic);
    }

    #[tokio::test]
    async fn classify_routes_through_model() {
        assert_eq!(
            classify("INVOICE #42 amount due", &MockModel).await,
            DocumentKind::Invoice
        );
        assert_eq!(
            classify("LEASE AGREEMENT between parties", &MockModel).await,
            DocumentKind::Contract
        );
    }

    #[test]
    fn empty_text_gate() {
        assert!(non_empty_text("", "x").is_err());
        assert!(non_empty_text("hello", "x").is_ok());
    }
}
