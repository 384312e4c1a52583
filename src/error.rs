//! Error types for the docfields library.
//!
//! One fatal error type covers the whole pipeline. The taxonomy mirrors the
//! three failure classes a caller has to tell apart:
//!
//! * **Input errors** — missing/corrupt file, bad page selector, bad schema
//!   file. The request never reached an adapter.
//! * **Adapter errors** — the OCR engine is missing or failed, or the remote
//!   model API rejected the call. Surfaced as-is; nothing is retried.
//! * **Response errors** — the model answered, but not with the JSON that was
//!   asked for. [`ExtractError::ResponseNotJson`] is deliberately distinct
//!   from the transport-level variants so callers can report "the model
//!   misbehaved" differently from "the network/auth failed".

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docfields library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file extension is neither PDF nor a supported raster format.
    #[error("Unsupported document format: '{path}'\nSupported: .pdf, .png, .jpg, .jpeg, .tiff, .tif, .bmp")]
    UnsupportedFormat { path: PathBuf },

    /// The file has a .pdf extension but does not start with `%PDF`.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// An image file could not be decoded.
    #[error("Failed to decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterizationFailed { page: usize, detail: String },

    /// A `--pages` selector string could not be parsed.
    #[error("Invalid page selector '{selector}': {detail}\nExpected 'a,b,c' or 'a-b' (0-indexed), e.g. '0,2,5' or '1-4'.")]
    InvalidPageSelector { selector: String, detail: String },

    /// A schema file was unreadable or not a JSON object.
    #[error("Invalid extraction schema '{path}': {detail}")]
    InvalidSchema { path: PathBuf, detail: String },

    /// The document produced no text to extract from.
    #[error("Document produced no text; cannot run {stage}")]
    EmptyDocument { stage: &'static str },

    // ── Adapter errors ────────────────────────────────────────────────────
    /// The tesseract binary is not installed or not on PATH.
    #[error(
        "Tesseract OCR is not installed or not on PATH.\n\
         Install it with:\n\
           Ubuntu/Debian: sudo apt-get install tesseract-ocr\n\
           macOS:         brew install tesseract"
    )]
    OcrUnavailable,

    /// The OCR engine ran but exited with an error.
    #[error("OCR failed on page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// Neither a mock, an API key, nor a project ID was configured.
    #[error("No vision model configured.\n{hint}")]
    ModelNotConfigured { hint: String },

    /// The HTTP request to the model API could not be completed.
    #[error("Model request failed: {reason}")]
    RequestFailed { reason: String },

    /// The model API returned a non-success status or an empty/blocked reply.
    #[error("Model API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    // ── Response errors ───────────────────────────────────────────────────
    /// JSON output was requested but the reply did not parse as a JSON object.
    #[error("Model response is not the requested JSON object: {detail}\nResponse began: {snippet:?}")]
    ResponseNotJson { detail: String, snippet: String },

    // ── I/O & config ──────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file was unreadable or malformed.
    #[error("Failed to load configuration '{path}': {detail}")]
    ConfigLoadFailed { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// True when the error came from parsing the model's reply rather than
    /// from transport, auth, or input handling.
    pub fn is_response_error(&self) -> bool {
        matches!(self, ExtractError::ResponseNotJson { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_error_mentions_selector() {
        let e = ExtractError::InvalidPageSelector {
            selector: "1-x".into(),
            detail: "invalid digit".into(),
        };
        assert!(e.to_string().contains("1-x"));
    }

    #[test]
    fn response_error_classification() {
        let e = ExtractError::ResponseNotJson {
            detail: "expected value".into(),
            snippet: "Sure! Here".into(),
        };
        assert!(e.is_response_error());

        let e = ExtractError::ApiError {
            status: 429,
            message: "quota".into(),
        };
        assert!(!e.is_response_error());
    }

    #[test]
    fn not_a_pdf_shows_magic() {
        let e = ExtractError::NotAPdf {
            path: PathBuf::from("x.pdf"),
            magic: *b"PK\x03\x04",
        };
        assert!(e.to_string().contains("x.pdf"));
    }
}
