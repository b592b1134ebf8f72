//! Configuration for pingpong-eye

use crate::color::ColorTable;
use crate::params::DetectionParameters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where frames come from. Chosen once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraSource {
    /// Rendered test scene with a moving ball; no hardware needed
    Synthetic,
    /// A fixed image file replayed every tick
    Still { path: PathBuf },
    /// USB camera by device index (needs the `opencv` feature)
    Device { index: u32 },
}

/// Vision system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub camera: CameraSource,
    /// Target capture rate (frames per second)
    pub frame_rate: u32,
    /// Capture resolution (width, height)
    pub resolution: (u32, u32),
    /// Gaussian sigma applied before circle detection
    pub blur_sigma: f32,
    /// JPEG quality of the annotated frame returned with detections
    pub jpeg_quality: u8,
    /// Detection parameters in effect at startup
    pub detection: DetectionParameters,
    /// Ordered color table used for classification
    pub colors: ColorTable,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            camera: CameraSource::Synthetic,
            frame_rate: 30,
            resolution: (640, 480),
            blur_sigma: 2.6,
            jpeg_quality: 95,
            detection: DetectionParameters::default(),
            colors: ColorTable::default(),
        }
    }
}

impl VisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_rate == 0 || self.frame_rate > 120 {
            return Err("Frame rate must be between 1 and 120".to_string());
        }

        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }

        if self.resolution.0 > 7680 || self.resolution.1 > 4320 {
            return Err("Resolution too large (max 8K)".to_string());
        }

        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err("Blur sigma must be a finite, non-negative number".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }

        if let CameraSource::Device { index } = self.camera {
            if index > 100 {
                return Err("Camera index too large (max 100)".to_string());
            }
        }

        self.detection.validate().map_err(|e| e.to_string())?;
        self.colors.validate()?;

        Ok(())
    }

    /// Delay between acquisition ticks
    pub fn frame_interval(&self) -> Duration {
        let frame_rate = self.frame_rate.max(1);
        Duration::from_secs_f64(1.0 / frame_rate as f64)
    }
}
