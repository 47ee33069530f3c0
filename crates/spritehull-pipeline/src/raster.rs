//! Image decoding.
//!
//! Accepts raw sprite-sheet bytes (PNG, JPEG, BMP, WebP) and produces an
//! RGBA raster whose alpha channel [`AlphaMask`](crate::mask::AlphaMask)
//! can borrow. This is the only place the pipeline crate touches an
//! encoded image format.

use image::RgbaImage;

use crate::types::PipelineError;

/// Decode raw image bytes into an RGBA raster.
///
/// Formats without an alpha channel decode as fully opaque.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode an RGBA image as a PNG byte buffer.
    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode_rgba(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_rgba(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn alpha_channel_survives_decoding() {
        let img = RgbaImage::from_fn(3, 2, |x, y| image::Rgba([9, 9, 9, (x * 40 + y) as u8]));
        let decoded = decode_rgba(&encode_png(&img)).unwrap();
        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.height(), 2);
        assert_eq!(decoded.get_pixel(2, 1).0[3], 81);
        assert_eq!(decoded.as_raw(), img.as_raw());
    }
}
