//! Smoothing and intensity conversion

use image::{GrayImage, Luma, RgbImage};

/// Gaussian blur with the given sigma. A non-positive sigma returns a copy.
pub fn gaussian_blur(image: &RgbImage, sigma: f32) -> RgbImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    image::imageops::blur(image, sigma)
}

/// Luma with BT.601 weights (0.299, 0.587, 0.114)
pub fn to_intensity(image: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());
    for (x, y, p) in image.enumerate_pixels() {
        let luma = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
        gray.put_pixel(x, y, Luma([luma.round().min(255.0) as u8]));
    }
    gray
}
