//! Pipeline stages for document extraction.
//!
//! Each submodule implements exactly one transformation step, so every stage
//! is independently testable and a backend can be swapped without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ vlm ─────▶ postprocess
//! (path)    (pdfium)   (base64)   (request)  (fences, JSON)
//!                └────▶ ocr ─────────────────────┘
//!                       (tesseract)
//! ```
//!
//! 1. [`input`]  — resolve the user-supplied path to a PDF or raster image
//! 2. [`render`] — rasterise selected pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`] — PNG-encode and base64-wrap each page for the multimodal
//!    request body
//! 4. [`vlm`]    — one batched `generateContent` exchange; the only stage
//!    with network I/O
//! 5. [`ocr`]    — alternative adapter: the local tesseract binary
//! 6. [`postprocess`] — strip markdown fences and parse JSON replies

pub mod encode;
pub mod input;
pub mod ocr;
pub mod postprocess;
pub mod render;
pub mod vlm;
