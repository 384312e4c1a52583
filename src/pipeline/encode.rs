//! Image encoding: `DynamicImage` → base64 PNG payload.
//!
//! The multimodal API accepts images as base64 `inline_data` parts in the
//! JSON request body. PNG is used because it is lossless — text crispness
//! matters far more than file size for extraction accuracy.

use crate::error::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// A page ready to be sent to the model.
#[derive(Debug, Clone)]
pub struct PagePayload {
    /// 0-based page index; payloads are kept in ascending page order.
    pub page_index: usize,
    pub mime_type: &'static str,
    /// Base64-encoded PNG bytes.
    pub data: String,
}

/// Encode a rasterised page as a base64 PNG payload.
pub fn encode_page(page_index: usize, img: &DynamicImage) -> Result<PagePayload, ExtractError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ExtractError::RasterizationFailed {
            page: page_index,
            detail: format!("PNG encoding failed: {}", e),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page {} → {} bytes base64", page_index, b64.len());

    Ok(PagePayload {
        page_index,
        mime_type: "image/png",
        data: b64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let payload = encode_page(3, &img).expect("encode should succeed");
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.page_index, 3);
        let decoded = STANDARD.decode(&payload.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
