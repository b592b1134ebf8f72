//! Hue-saturation-value conversion on the 8-bit scale: hue in 0..180,
//! saturation and value in 0..=255.

use image::RgbImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let (rf, gf, bf) = (r as f32, g as f32, b as f32);
        let v = rf.max(gf).max(bf);
        let min = rf.min(gf).min(bf);
        let delta = v - min;

        let s = if v > 0.0 { delta * 255.0 / v } else { 0.0 };

        let h = if delta == 0.0 {
            0.0
        } else if v == rf {
            60.0 * (gf - bf) / delta
        } else if v == gf {
            120.0 + 60.0 * (bf - rf) / delta
        } else {
            240.0 + 60.0 * (rf - gf) / delta
        };
        let h = if h < 0.0 { h + 360.0 } else { h };

        // 360 / 2 would land on 180, which is outside the 8-bit hue range
        let h = ((h / 2.0).round() as u32 % 180) as u8;

        Self {
            h,
            s: s.round().min(255.0) as u8,
            v: v as u8,
        }
    }

    /// Inclusive per-channel range check
    pub fn within(&self, lower: &Hsv, upper: &Hsv) -> bool {
        (lower.h..=upper.h).contains(&self.h)
            && (lower.s..=upper.s).contains(&self.s)
            && (lower.v..=upper.v).contains(&self.v)
    }
}

/// Per-pixel HSV view of an RGB image
#[derive(Debug, Clone)]
pub struct HsvImage {
    width: u32,
    height: u32,
    pixels: Vec<Hsv>,
}

impl HsvImage {
    pub fn from_rgb(image: &RgbImage) -> Self {
        let pixels = image
            .pixels()
            .map(|p| Hsv::from_rgb(p[0], p[1], p[2]))
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Hsv> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_primary_colors() {
        assert_eq!(Hsv::from_rgb(255, 0, 0), Hsv::new(0, 255, 255));
        assert_eq!(Hsv::from_rgb(0, 255, 0), Hsv::new(60, 255, 255));
        assert_eq!(Hsv::from_rgb(0, 0, 255), Hsv::new(120, 255, 255));
    }

    #[test]
    fn test_gray_has_no_hue_or_saturation() {
        assert_eq!(Hsv::from_rgb(0, 0, 0), Hsv::new(0, 0, 0));
        assert_eq!(Hsv::from_rgb(200, 200, 200), Hsv::new(0, 0, 200));
    }

    #[test]
    fn test_orange() {
        let hsv = Hsv::from_rgb(255, 128, 0);
        assert_eq!(hsv.h, 15);
        assert_eq!(hsv.s, 255);
        assert_eq!(hsv.v, 255);
    }

    #[test]
    fn test_within_is_inclusive() {
        let lower = Hsv::new(10, 100, 20);
        let upper = Hsv::new(25, 255, 255);
        assert!(Hsv::new(10, 100, 20).within(&lower, &upper));
        assert!(Hsv::new(25, 255, 255).within(&lower, &upper));
        assert!(!Hsv::new(9, 255, 255).within(&lower, &upper));
        assert!(!Hsv::new(15, 99, 255).within(&lower, &upper));
    }

    #[test]
    fn test_hsv_image_lookup() {
        let image = RgbImage::from_pixel(3, 2, image::Rgb([0, 0, 255]));
        let hsv = HsvImage::from_rgb(&image);
        assert_eq!(hsv.get(2, 1), Some(Hsv::new(120, 255, 255)));
        assert_eq!(hsv.get(3, 0), None);
    }

    proptest! {
        #[test]
        fn prop_hue_in_8bit_range(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let hsv = Hsv::from_rgb(r, g, b);
            prop_assert!(hsv.h < 180);
            prop_assert_eq!(hsv.v, r.max(g).max(b));
        }
    }
}
