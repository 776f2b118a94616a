//! Image encoding: `DynamicImage` → base64 PNG data URI.
//!
//! OpenAI-compatible vision endpoints accept images as base64 data-URIs
//! embedded in the JSON request body. PNG is chosen over JPEG because it is
//! lossless — text crispness matters far more than file size for
//! transcription accuracy.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// An encoded page image ready for the inference request.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// `data:image/png;base64,...` URI.
    pub data_uri: String,
}

/// Encode a rasterised page as a base64 PNG data URI.
pub fn encode_page(img: &DynamicImage) -> Result<PageImage, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(PageImage {
        data_uri: format!("data:image/png;base64,{b64}"),
    })
}
