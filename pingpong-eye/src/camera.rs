//! Frame sources

use crate::config::{CameraSource, VisionConfig};
use crate::error::VisionError;
use crate::imgproc::draw;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::info;

/// A source of RGB frames.
///
/// `capture_frame` blocks until a frame is available or the device reports a
/// failure. Implementations are driven from a single acquisition task and so
/// only need to be `Send`.
pub trait Camera: Send {
    fn capture_frame(&mut self) -> Result<RgbImage, VisionError>;

    /// Release the underlying device. Called once when acquisition stops.
    fn release(&mut self) {}

    fn name(&self) -> &str;
}

/// Open the camera selected by `config.camera`.
pub fn open(config: &VisionConfig) -> Result<Box<dyn Camera>, VisionError> {
    let (width, height) = config.resolution;
    let camera: Box<dyn Camera> = match &config.camera {
        CameraSource::Synthetic => Box::new(SyntheticCamera::new(width, height)),
        CameraSource::Still { path } => Box::new(StillImageCamera::open(path)?),
        CameraSource::Device { index } => open_device(*index, config)?,
    };
    info!("Camera '{}' opened", camera.name());
    Ok(camera)
}

#[cfg(feature = "opencv")]
fn open_device(index: u32, config: &VisionConfig) -> Result<Box<dyn Camera>, VisionError> {
    Ok(Box::new(opencv_camera::OpenCvCamera::open(index, config)?))
}

#[cfg(not(feature = "opencv"))]
fn open_device(index: u32, _config: &VisionConfig) -> Result<Box<dyn Camera>, VisionError> {
    Err(VisionError::Camera(format!(
        "Camera device {} requested but pingpong-eye was built without the `opencv` feature",
        index
    )))
}

/// Renders a dark table with two balls bouncing across it.
///
/// The orange ball moves horizontally, the white one vertically, so every
/// frame contains two well-separated discs of known color.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    tick: u64,
    ball_radius: u32,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        let ball_radius = (width.min(height) / 20).clamp(15, 30);
        Self {
            width,
            height,
            tick: 0,
            ball_radius,
        }
    }

    pub fn ball_radius(&self) -> u32 {
        self.ball_radius
    }

    fn bounce(position: u64, span: u32) -> u32 {
        if span == 0 {
            return 0;
        }
        let period = 2 * span as u64;
        let phase = position % period;
        if phase < span as u64 {
            phase as u32
        } else {
            (period - phase) as u32
        }
    }

    fn render(&self) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width, self.height, Rgb([20, 20, 24]));
        let r = self.ball_radius;
        let margin = 2 * r;
        let span_x = self.width.saturating_sub(2 * margin);
        let span_y = self.height.saturating_sub(2 * margin);

        let orange_x = margin + Self::bounce(self.tick * 4, span_x);
        let orange_y = self.height / 3;
        draw::fill_disc(&mut image, orange_x as i32, orange_y as i32, r, Rgb([255, 128, 0]));

        let white_x = (self.width * 3) / 4;
        let white_y = margin + Self::bounce(self.tick * 3, span_y);
        draw::fill_disc(&mut image, white_x as i32, white_y as i32, r, Rgb([240, 240, 240]));

        image
    }
}

impl Camera for SyntheticCamera {
    fn capture_frame(&mut self) -> Result<RgbImage, VisionError> {
        let image = self.render();
        self.tick = self.tick.wrapping_add(1);
        Ok(image)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Replays a single image file on every capture.
pub struct StillImageCamera {
    path: PathBuf,
    image: RgbImage,
    label: String,
}

impl StillImageCamera {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let path = path.as_ref().to_path_buf();
        let image = image::open(&path)
            .map_err(|e| VisionError::Camera(format!("Failed to open still image {}: {}", path.display(), e)))?
            .to_rgb8();
        let label = format!("still:{}", path.display());
        Ok(Self { path, image, label })
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self {
            path: PathBuf::new(),
            image,
            label: "still:memory".to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Camera for StillImageCamera {
    fn capture_frame(&mut self) -> Result<RgbImage, VisionError> {
        Ok(self.image.clone())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(feature = "opencv")]
mod opencv_camera {
    use super::Camera;
    use crate::config::VisionConfig;
    use crate::error::VisionError;
    use image::RgbImage;
    use opencv::{
        core::Mat,
        prelude::*,
        videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
    };
    use tracing::info;

    /// USB camera through OpenCV's videoio
    pub struct OpenCvCamera {
        capture: Option<VideoCapture>,
        label: String,
    }

    impl OpenCvCamera {
        pub fn open(index: u32, config: &VisionConfig) -> Result<Self, VisionError> {
            let mut capture = VideoCapture::new(index as i32, CAP_ANY)
                .map_err(|e| VisionError::Camera(format!("Failed to open camera {}: {}", index, e)))?;

            if !capture.is_opened()? {
                return Err(VisionError::Camera(format!("Camera {} failed to open", index)));
            }

            capture.set(CAP_PROP_FRAME_WIDTH, config.resolution.0 as f64)?;
            capture.set(CAP_PROP_FRAME_HEIGHT, config.resolution.1 as f64)?;
            capture.set(CAP_PROP_FPS, config.frame_rate as f64)?;

            info!(
                "Camera {} initialized at {}x{} @ {}fps",
                index, config.resolution.0, config.resolution.1, config.frame_rate
            );

            Ok(Self {
                capture: Some(capture),
                label: format!("device:{}", index),
            })
        }
    }

    impl Camera for OpenCvCamera {
        fn capture_frame(&mut self) -> Result<RgbImage, VisionError> {
            let capture = self
                .capture
                .as_mut()
                .ok_or_else(|| VisionError::Camera("Camera released".to_string()))?;

            let mut mat = Mat::default();
            if !capture.read(&mut mat)? || mat.empty() {
                return Err(VisionError::Camera("Camera returned no frame".to_string()));
            }
            if mat.channels() != 3 {
                return Err(VisionError::Camera(format!(
                    "Expected 3-channel BGR frame, got {} channels",
                    mat.channels()
                )));
            }

            let width = mat.cols() as u32;
            let height = mat.rows() as u32;
            let mat = if mat.is_continuous() { mat } else { mat.try_clone()? };
            let bgr = mat.data_bytes()?;

            let mut rgb = Vec::with_capacity(bgr.len());
            for px in bgr.chunks_exact(3) {
                rgb.extend_from_slice(&[px[2], px[1], px[0]]);
            }

            RgbImage::from_raw(width, height, rgb)
                .ok_or_else(|| VisionError::Camera("Frame size mismatch".to_string()))
        }

        fn release(&mut self) {
            if let Some(mut capture) = self.capture.take() {
                let _ = capture.release();
            }
        }

        fn name(&self) -> &str {
            &self.label
        }
    }
}
