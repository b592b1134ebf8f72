//! Captured camera frame

use chrono::{DateTime, Utc};
use image::RgbImage;

/// One captured RGB frame.
///
/// Frames are never modified after capture; consumers that need to draw on a
/// frame work on their own copy of `image`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
    sequence: u64,
    captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap a freshly captured image. The sequence number is assigned by the
    /// frame store on publish.
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            sequence: 0,
            captured_at: Utc::now(),
        }
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Publication order, starting at 1 for the first published frame
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Frame::new(image)
    }
}
