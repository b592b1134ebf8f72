//! Ball color classification against an ordered HSV range table

use crate::imgproc::{Hsv, HsvImage};
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Label returned when no range intersects the region
pub const UNKNOWN_COLOR: &str = "unknown";

/// Named inclusive HSV range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    pub name: String,
    pub lower: Hsv,
    pub upper: Hsv,
}

impl ColorRange {
    pub fn new(name: impl Into<String>, lower: Hsv, upper: Hsv) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
        }
    }

    pub fn contains(&self, hsv: &Hsv) -> bool {
        hsv.within(&self.lower, &self.upper)
    }
}

/// Ordered color table. Order decides ties: when a region intersects several
/// ranges, the earliest entry wins no matter how many pixels each range
/// covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorTable {
    ranges: Vec<ColorRange>,
}

impl Default for ColorTable {
    fn default() -> Self {
        let range = |name: &str, lower: (u8, u8, u8), upper: (u8, u8, u8)| {
            ColorRange::new(
                name,
                Hsv::new(lower.0, lower.1, lower.2),
                Hsv::new(upper.0, upper.1, upper.2),
            )
        };
        Self {
            ranges: vec![
                range("red", (0, 120, 70), (10, 255, 255)),
                range("orange", (10, 100, 20), (25, 255, 255)),
                range("yellow", (25, 100, 20), (35, 255, 255)),
                range("green", (35, 100, 20), (85, 255, 255)),
                range("blue", (85, 100, 20), (125, 255, 255)),
                range("purple", (125, 100, 20), (155, 255, 255)),
                range("white", (0, 0, 200), (180, 55, 255)),
            ],
        }
    }
}

impl ColorTable {
    pub fn new(ranges: Vec<ColorRange>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[ColorRange] {
        &self.ranges
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ranges.is_empty() {
            return Err("Color table must contain at least one range".to_string());
        }
        for range in &self.ranges {
            if range.name.trim().is_empty() {
                return Err("Color range name cannot be empty".to_string());
            }
            if range.lower.h > range.upper.h
                || range.lower.s > range.upper.s
                || range.lower.v > range.upper.v
            {
                return Err(format!("Color range '{}' has lower bound above upper bound", range.name));
            }
        }
        Ok(())
    }

    /// Name of the first range that matches at least one masked pixel.
    ///
    /// `mask` selects the region (non-zero pixels) and must have the same
    /// dimensions as `hsv`; pixels outside either image are ignored.
    pub fn classify(&self, hsv: &HsvImage, mask: &GrayImage) -> &str {
        let region: Vec<Hsv> = mask
            .enumerate_pixels()
            .filter(|(_, _, m)| m[0] != 0)
            .filter_map(|(x, y, _)| hsv.get(x, y))
            .collect();

        self.ranges
            .iter()
            .find(|range| region.iter().any(|px| range.contains(px)))
            .map(|range| range.name.as_str())
            .unwrap_or(UNKNOWN_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imgproc::draw::disc_mask;
    use image::{Rgb, RgbImage};

    fn full_mask(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, image::Luma([255]))
    }

    #[test]
    fn test_default_table_order() {
        let table = ColorTable::default();
        let names: Vec<&str> = table.ranges().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["red", "orange", "yellow", "green", "blue", "purple", "white"]
        );
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_classify_solid_colors() {
        let table = ColorTable::default();
        let cases = [
            (Rgb([255, 128, 0]), "orange"),
            (Rgb([0, 0, 255]), "blue"),
            (Rgb([0, 200, 0]), "green"),
            (Rgb([240, 240, 240]), "white"),
        ];
        for (rgb, expected) in cases {
            let image = RgbImage::from_pixel(8, 8, rgb);
            let hsv = HsvImage::from_rgb(&image);
            assert_eq!(table.classify(&hsv, &full_mask(8, 8)), expected, "{:?}", rgb);
        }
    }

    #[test]
    fn test_first_match_wins_regardless_of_area() {
        // Mostly orange with a single red pixel: red is earlier in the table
        let mut image = RgbImage::from_pixel(10, 10, Rgb([255, 128, 0]));
        image.put_pixel(5, 5, Rgb([255, 0, 0]));
        let hsv = HsvImage::from_rgb(&image);
        let table = ColorTable::default();
        assert_eq!(table.classify(&hsv, &full_mask(10, 10)), "red");
    }

    #[test]
    fn test_overlapping_ranges_take_earlier_entry() {
        let both = ColorTable::new(vec![
            ColorRange::new("first", Hsv::new(0, 0, 0), Hsv::new(179, 255, 255)),
            ColorRange::new("second", Hsv::new(0, 0, 0), Hsv::new(179, 255, 255)),
        ]);
        let image = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let hsv = HsvImage::from_rgb(&image);
        assert_eq!(both.classify(&hsv, &full_mask(4, 4)), "first");
    }

    #[test]
    fn test_unknown_when_nothing_matches() {
        let table = ColorTable::default();
        let image = RgbImage::from_pixel(6, 6, Rgb([20, 20, 24]));
        let hsv = HsvImage::from_rgb(&image);
        assert_eq!(table.classify(&hsv, &full_mask(6, 6)), UNKNOWN_COLOR);
    }

    #[test]
    fn test_mask_restricts_region() {
        let mut image = RgbImage::from_pixel(40, 40, Rgb([0, 0, 255]));
        for (x, y, p) in image.enumerate_pixels_mut() {
            let (dx, dy) = (x as i32 - 20, y as i32 - 20);
            if dx * dx + dy * dy <= 36 {
                *p = Rgb([255, 128, 0]);
            }
        }
        let hsv = HsvImage::from_rgb(&image);
        let table = ColorTable::default();
        assert_eq!(table.classify(&hsv, &disc_mask(40, 40, 20, 20, 5)), "orange");
        assert_eq!(table.classify(&hsv, &GrayImage::new(40, 40)), UNKNOWN_COLOR);
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let table = ColorTable::new(vec![ColorRange::new(
            "broken",
            Hsv::new(50, 0, 0),
            Hsv::new(10, 255, 255),
        )]);
        assert!(table.validate().is_err());
        assert!(ColorTable::new(vec![]).validate().is_err());
    }
}
