//! JPEG and base64 encoding of frames

use crate::error::VisionError;
use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, VisionError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|e| VisionError::Encoding(format!("JPEG encode failed: {}", e)))?;
    Ok(buffer)
}

pub fn encode_jpeg_base64(image: &RgbImage, quality: u8) -> Result<String, VisionError> {
    let jpeg = encode_jpeg(image, quality)?;
    Ok(general_purpose::STANDARD.encode(jpeg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_jpeg_has_markers() {
        let image = RgbImage::from_pixel(16, 16, Rgb([10, 200, 30]));
        let jpeg = encode_jpeg(&image, 80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_base64_decodes_to_jpeg() {
        let image = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        let encoded = encode_jpeg_base64(&image, 95).unwrap();
        let decoded = general_purpose::STANDARD.decode(encoded).unwrap();
        let round = image::load_from_memory(&decoded).unwrap();
        assert_eq!((round.width(), round.height()), (8, 8));
    }
}
