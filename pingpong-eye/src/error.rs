//! Error types for pingpong-eye

use pingpong_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("No frame available")]
    NoFrameAvailable,

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Invalid detection parameters: {0}")]
    InvalidParameters(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("OpenCV error: {0}")]
    OpenCv(String),
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::NoFrameAvailable => CoreError::Unavailable(err.to_string()),
            VisionError::InvalidParameters(_) => CoreError::InvalidInput(err.to_string()),
            VisionError::Camera(_) | VisionError::OpenCv(_) => CoreError::Hardware(err.to_string()),
            VisionError::Config(_) => CoreError::Configuration(err.to_string()),
            VisionError::Io(e) => CoreError::Io(e),
            VisionError::Processing(_) | VisionError::Encoding(_) | VisionError::Image(_) => {
                CoreError::Internal(format!("Vision error: {}", err))
            }
        }
    }
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for VisionError {
    fn from(err: opencv::Error) -> Self {
        VisionError::OpenCv(err.message)
    }
}
