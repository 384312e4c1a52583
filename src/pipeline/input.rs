//! Input resolution: classify a user-supplied path as PDF or raster image.
//!
//! PDFs are verified against the `%PDF` magic bytes before pdfium ever sees
//! them, so callers get a meaningful error rather than a cryptic parser
//! failure. Raster images are accepted by extension and decoded later.

use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Raster extensions the pipeline accepts alongside PDF.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "bmp"];

/// What kind of file the input turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Image,
}

/// A validated input document.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub path: PathBuf,
    pub format: DocumentFormat,
}

/// Resolve and validate an input path.
///
/// Checks existence, readability, and (for PDFs) the `%PDF` magic bytes.
pub fn resolve_input(path_str: impl AsRef<Path>) -> Result<ResolvedDocument, ExtractError> {
    let path = path_str.as_ref().to_path_buf();

    if !path.exists() {
        return Err(ExtractError::FileNotFound { path });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let format = if ext == "pdf" {
        DocumentFormat::Pdf
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        DocumentFormat::Image
    } else {
        return Err(ExtractError::UnsupportedFormat { path });
    };

    // Check read permission by opening; verify PDF magic while we're at it.
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            if format == DocumentFormat::Pdf {
                use std::io::Read;
                let mut magic = [0u8; 4];
                if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                    return Err(ExtractError::NotAPdf { path, magic });
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ExtractError::FileNotFound { path });
        }
    }

    debug!("Resolved input {} as {:?}", path.display(), format);
    Ok(ResolvedDocument { path, format })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file_with(name: &str, contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(contents)
            .unwrap();
        (dir, path)
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_input("/no/such/file.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn pdf_magic_is_verified() {
        let (_dir, path) = temp_file_with("doc.pdf", b"%PDF-1.7 rest");
        let doc = resolve_input(&path).unwrap();
        assert_eq!(doc.format, DocumentFormat::Pdf);

        let (_dir, path) = temp_file_with("fake.pdf", b"PK\x03\x04zipzip");
        let err = resolve_input(&path).unwrap_err();
        assert!(matches!(err, ExtractError::NotAPdf { .. }));
    }

    #[test]
    fn image_extensions_are_accepted() {
        for name in ["scan.png", "scan.JPG", "scan.tiff"] {
            let (_dir, path) = temp_file_with(name, b"whatever");
            let doc = resolve_input(&path).unwrap();
            assert_eq!(doc.format, DocumentFormat::Image, "for {name}");
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let (_dir, path) = temp_file_with("doc.docx", b"whatever");
        let err = resolve_input(&path).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat { .. }));
    }
}
