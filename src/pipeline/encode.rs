//! Image encoding: `DynamicImage` → base64 JPEG wrapped in [`PageImage`].
//!
//! The hosted model takes inline base64 payloads. JPEG keeps a many-page
//! statement inside request size limits; at the default quality the small
//! print of a transaction table stays legible.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// MIME type of every encoded page.
pub const PAGE_MIME_TYPE: &str = "image/jpeg";

/// One rendered page ready to embed in a model request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-indexed.
    pub page_num: usize,
    pub mime_type: String,
    /// Base64 (standard alphabet, padded) image bytes.
    pub data: String,
}

/// Encode a rasterised page as a base64 JPEG.
///
/// Alpha is dropped first; JPEG has no alpha channel and pdfium renders RGBA.
pub fn encode_page(
    page_num: usize,
    img: &DynamicImage,
    quality: u8,
) -> Result<PageImage, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;

    let data = STANDARD.encode(&buf);
    debug!("Encoded page {} → {} bytes base64", page_num, data.len());

    Ok(PageImage {
        page_num,
        mime_type: PAGE_MIME_TYPE.to_string(),
        data,
    })
}
