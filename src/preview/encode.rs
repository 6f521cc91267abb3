//! `DynamicImage` → `data:image/png;base64,...`.
//!
//! PNG keeps rendered text crisp; thumbnails of scanned pages are mostly
//! text, and JPEG artefacts make them hard to read at small sizes.

use crate::error::HistoryError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

const PNG_PREFIX: &str = "data:image/png;base64,";

/// Encode a rendered page as a PNG data URL.
pub fn to_data_url(img: &DynamicImage) -> Result<String, HistoryError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| HistoryError::RenderFailed(format!("PNG encode: {e}")))?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded preview → {} bytes base64", b64.len());
    Ok(format!("{PNG_PREFIX}{b64}"))
}

/// PNG bytes of a data URL produced by [`to_data_url`].
pub fn decode_data_url(data_url: &str) -> Option<Vec<u8>> {
    let b64 = data_url.strip_prefix(PNG_PREFIX)?;
    STANDARD.decode(b64).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let url = to_data_url(&img).expect("encode should succeed");
        assert!(url.starts_with("data:image/png;base64,"));

        let png = decode_data_url(&url).expect("valid base64");
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn foreign_data_url_is_rejected() {
        assert!(decode_data_url("data:image/jpeg;base64,AAAA").is_none());
        assert!(decode_data_url("https://x.example/a.png").is_none());
    }
}
