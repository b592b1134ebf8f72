//! pingpong-eye: vision side of the ball feeder
//!
//! Continuously acquires camera frames into a single-slot store and, on
//! request, turns the freshest frame into classified ball detections:
//! Hough circle detection over a blurred intensity image, followed by
//! first-match HSV color classification of each detected disc.
//!
//! With the `opencv` feature, capture and detection run on OpenCV; the
//! `imgproc` module is the pure-Rust fallback used otherwise.

pub mod error;
pub mod config;
pub mod frame;
pub mod frame_store;
pub mod camera;
pub mod acquisition;
pub mod imgproc;
pub mod color;
pub mod params;
pub mod detection;
#[cfg(feature = "opencv")]
mod cv_detection;
pub mod encoding;
pub mod ball_tracker;

pub use error::VisionError;
pub use config::{CameraSource, VisionConfig};
pub use frame::Frame;
pub use frame_store::FrameStore;
pub use camera::{Camera, StillImageCamera, SyntheticCamera};
pub use acquisition::{AcquisitionStats, FrameAcquisition};
pub use color::{ColorRange, ColorTable, UNKNOWN_COLOR};
pub use params::DetectionParameters;
pub use detection::{BallDetection, DetectionOutcome, DetectionPipeline};
pub use ball_tracker::{BallTracker, DetectionReport};
