//! Per-frame ball detection and classification

use crate::color::ColorTable;
use crate::frame::Frame;
use crate::imgproc::{draw, filter, hough_circles, HsvImage};
use crate::params::DetectionParameters;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;
#[cfg(feature = "opencv")]
use tracing::warn;

const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub(crate) const OUTLINE_THICKNESS: u32 = 4;
const LABEL_SCALE: u32 = 2;

/// One detected, classified ball in frame pixel coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallDetection {
    pub x: u32,
    pub y: u32,
    pub color: String,
    pub radius: u32,
}

#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    /// Detector order: strongest accumulator peak first
    pub balls: Vec<BallDetection>,
    /// Copy of the input frame with outlines and color labels drawn on it
    pub annotated: RgbImage,
}

/// Stateless detection pipeline. Safe to run concurrently on distinct frames.
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    colors: ColorTable,
    blur_sigma: f32,
}

impl DetectionPipeline {
    pub fn new(colors: ColorTable, blur_sigma: f32) -> Self {
        Self { colors, blur_sigma }
    }

    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    /// Detect and classify balls in `frame`.
    ///
    /// With the `opencv` feature the work goes through OpenCV's imgproc and
    /// the in-crate detector is only used if that call fails.
    pub fn detect(&self, frame: &Frame, params: &DetectionParameters) -> DetectionOutcome {
        #[cfg(feature = "opencv")]
        match crate::cv_detection::detect(frame.image(), params, &self.colors, self.blur_sigma) {
            Ok(outcome) => return outcome,
            Err(e) => warn!("OpenCV detection failed, using built-in detector: {}", e),
        }

        self.detect_builtin(frame.image(), params)
    }

    /// The in-crate pipeline over `image` crate buffers
    pub fn detect_builtin(&self, image: &RgbImage, params: &DetectionParameters) -> DetectionOutcome {
        let (width, height) = image.dimensions();

        let hsv = HsvImage::from_rgb(image);
        let blurred = filter::gaussian_blur(image, self.blur_sigma);
        let gray = filter::to_intensity(&blurred);
        let circles = hough_circles(&gray, params);

        let mut annotated = image.clone();
        let mut balls = Vec::with_capacity(circles.len());

        for circle in circles {
            let x = circle.x.round().max(0.0) as u32;
            let y = circle.y.round().max(0.0) as u32;
            let radius = circle.radius.round().max(0.0) as u32;

            let mask = draw::disc_mask(width, height, x as i32, y as i32, radius);
            let color = self.colors.classify(&hsv, &mask).to_string();

            draw::draw_circle(
                &mut annotated,
                x as i32,
                y as i32,
                radius,
                OUTLINE_THICKNESS,
                ANNOTATION_COLOR,
            );
            let label_x = x as i32 - radius as i32;
            let label_y = y as i32 - radius as i32 - 10 - 7 * LABEL_SCALE as i32;
            draw::draw_label(&mut annotated, label_x, label_y, &color, LABEL_SCALE, ANNOTATION_COLOR);

            debug!(x, y, radius, color = %color, votes = circle.votes, "Ball detected");
            balls.push(BallDetection { x, y, color, radius });
        }

        DetectionOutcome { balls, annotated }
    }
}

impl Default for DetectionPipeline {
    fn default() -> Self {
        Self::new(ColorTable::default(), 2.6)
    }
}
