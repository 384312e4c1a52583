//! OCR adapter: text extraction through the external `tesseract` binary.
//!
//! The engine is invoked as a subprocess (`tesseract <image> stdout`) rather
//! than through FFI bindings — the same route the original tooling in this
//! space takes. Page images are written to a scratch directory that cleans
//! itself up when the call returns.
//!
//! A missing binary is a fatal, user-visible [`ExtractError::OcrUnavailable`]
//! with install instructions; no fallback is attempted.

use crate::config::OcrSettings;
use crate::error::ExtractError;
use crate::pipeline::render::PageImage;
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};

/// Result of running OCR over a document.
#[derive(Debug, Clone)]
pub struct OcrText {
    /// Page texts joined with a blank line, in page order.
    pub text: String,
    pub word_count: usize,
    pub duration_ms: u64,
}

impl OcrText {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Tesseract subprocess wrapper.
pub struct TesseractOcr {
    settings: OcrSettings,
}

impl TesseractOcr {
    pub fn new(settings: OcrSettings) -> Self {
        Self { settings }
    }

    /// Probe for the engine without running a recognition pass.
    pub async fn is_available() -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// Run OCR over rasterised pages. Pages are processed in order and the
    /// texts joined with a blank line.
    pub async fn extract_from_images(
        &self,
        pages: &[PageImage],
    ) -> Result<OcrText, ExtractError> {
        let start = Instant::now();
        let scratch = tempfile::TempDir::new()
            .map_err(|e| ExtractError::Internal(format!("scratch dir: {}", e)))?;

        let mut page_texts = Vec::with_capacity(pages.len());
        for page in pages {
            let img_path = scratch.path().join(format!("page-{}.png", page.index));
            page.image
                .save_with_format(&img_path, image::ImageFormat::Png)
                .map_err(|e| ExtractError::Internal(format!("scratch PNG: {}", e)))?;

            let text = self.run_engine(&img_path, page.index).await?;
            debug!(
                "OCR page {}: {} chars",
                page.index,
                text.len()
            );
            page_texts.push(text);
        }

        let text = page_texts.join("\n\n");
        let word_count = text.split_whitespace().count();
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "OCR finished: {} pages, {} words, {}ms",
            pages.len(),
            word_count,
            duration_ms
        );

        Ok(OcrText {
            text,
            word_count,
            duration_ms,
        })
    }

    async fn run_engine(&self, image_path: &Path, page: usize) -> Result<String, ExtractError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.settings.lang)
            .arg("--psm")
            .arg(self.settings.psm.to_string())
            .arg("--oem")
            .arg(self.settings.oem.to_string())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractError::OcrUnavailable
                } else {
                    ExtractError::OcrFailed {
                        page,
                        detail: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(ExtractError::OcrFailed {
                page,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OcrSettings;
    use image::{DynamicImage, Rgba, RgbaImage};

    #[test]
    fn ocr_text_emptiness() {
        let t = OcrText {
            text: "  \n ".into(),
            word_count: 0,
            duration_ms: 1,
        };
        assert!(t.is_empty());
    }

    // Needs the tesseract binary; skipped when it is not installed.
    #[tokio::test]
    async fn blank_image_yields_empty_text() {
        if !TesseractOcr::is_available().await {
            eprintln!("SKIP — tesseract not installed");
            return;
        }
        let ocr = TesseractOcr::new(OcrSettings::default());
        let blank = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            120,
            120,
            Rgba([255, 255, 255, 255]),
        ));
        let result = ocr
            .extract_from_images(&[PageImage {
                index: 0,
                image: blank,
            }])
            .await
            .expect("OCR on a blank page should succeed");
        assert!(result.is_empty());
    }
}
