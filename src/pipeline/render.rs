//! PDF rasterisation: render selected pages to images via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto the blocking
//! thread pool so Tokio workers are not stalled by CPU-heavy rendering.
//!
//! ## DPI semantics
//!
//! DPI is a zoom factor relative to the PDF's native 72-DPI coordinate
//! space: the target pixel width is `page_width_pts × dpi / 72`, capped per
//! dimension by `max_rendered_pixels` so an oversized page cannot exhaust
//! memory. Pixel dimensions are therefore non-decreasing in DPI until the
//! cap is hit.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// A rasterised page, tagged with its 0-based index in the document.
pub struct PageImage {
    pub index: usize,
    pub image: DynamicImage,
}

/// Target pixel width for a page of `width_pts` points rendered at `dpi`,
/// capped at `max_pixels`.
pub(crate) fn target_width(width_pts: f32, dpi: u32, max_pixels: u32) -> i32 {
    let px = (width_pts * dpi as f32 / 72.0).round() as i64;
    px.clamp(1, max_pixels as i64) as i32
}

/// Count the pages of a PDF without rendering anything.
pub async fn page_count(pdf_path: &Path) -> Result<usize, ExtractError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let pdfium = Pdfium::default();
        let document = pdfium
            .load_pdf_from_file(&path, None)
            .map_err(|e| ExtractError::CorruptPdf {
                path: path.clone(),
                detail: format!("{:?}", e),
            })?;
        Ok(document.pages().len() as usize)
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Page-count task panicked: {}", e)))?
}

/// Rasterise selected pages of a PDF into images.
///
/// Returns pages ordered by ascending index. A zero-page document or a
/// selection matching no page yields an empty vector, not an error.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ExtractionConfig,
    page_indices: &[usize],
) -> Result<Vec<PageImage>, ExtractError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || render_pages_blocking(&path, dpi, max_pixels, &indices))
        .await
        .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    page_indices: &[usize],
) -> Result<Vec<PageImage>, ExtractError> {
    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| ExtractError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total_pages {
            warn!("Skipping page {} (out of range, total={})", idx, total_pages);
            continue;
        }

        let page = pages
            .get(idx as u16)
            .map_err(|e| ExtractError::RasterizationFailed {
                page: idx,
                detail: format!("{:?}", e),
            })?;

        let width = target_width(page.width().value, dpi, max_pixels);
        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_maximum_height(max_pixels as i32);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractError::RasterizationFailed {
                page: idx,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} at {} DPI → {}x{} px",
            idx,
            dpi,
            image.width(),
            image.height()
        );

        results.push(PageImage { index: idx, image });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_width_scales_with_dpi() {
        // A4 is 595 pts wide; higher DPI must not shrink the render.
        let w72 = target_width(595.0, 72, 10_000);
        let w150 = target_width(595.0, 150, 10_000);
        let w300 = target_width(595.0, 300, 10_000);
        assert_eq!(w72, 595);
        assert!(w72 <= w150 && w150 <= w300);
        assert_eq!(w150, 1240); // 595 * 150/72, rounded
    }

    #[test]
    fn target_width_respects_cap() {
        assert_eq!(target_width(595.0, 400, 2000), 2000);
        // monotone even at the cap
        assert!(target_width(595.0, 399, 2000) <= target_width(595.0, 400, 2000));
    }

    #[test]
    fn target_width_never_zero() {
        assert_eq!(target_width(0.1, 72, 2000), 1);
    }
}
