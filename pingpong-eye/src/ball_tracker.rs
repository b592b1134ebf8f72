//! Ball tracking service: detection on demand over the latest frame

use crate::config::VisionConfig;
use crate::detection::{BallDetection, DetectionPipeline};
use crate::encoding;
use crate::error::VisionError;
use crate::frame_store::FrameStore;
use crate::params::DetectionParameters;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Result of one detection request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub detections: Vec<BallDetection>,
    /// Annotated frame, JPEG encoded then base64 (standard alphabet)
    pub frame_jpeg_base64: String,
    pub frame_sequence: u64,
    pub captured_at: DateTime<Utc>,
}

/// Runs the detection pipeline over the freshest frame of a [`FrameStore`]
/// with the current [`DetectionParameters`].
pub struct BallTracker {
    store: Arc<FrameStore>,
    pipeline: DetectionPipeline,
    params: RwLock<DetectionParameters>,
    jpeg_quality: u8,
}

impl BallTracker {
    pub fn new(store: Arc<FrameStore>, config: &VisionConfig) -> Self {
        Self {
            store,
            pipeline: DetectionPipeline::new(config.colors.clone(), config.blur_sigma),
            params: RwLock::new(config.detection.clone()),
            jpeg_quality: config.jpeg_quality,
        }
    }

    pub fn store(&self) -> &Arc<FrameStore> {
        &self.store
    }

    /// Detect and classify balls in the latest frame.
    ///
    /// CPU bound; async callers should run it on a blocking thread.
    pub fn latest_detections(&self) -> Result<DetectionReport, VisionError> {
        let frame = self.store.snapshot().ok_or(VisionError::NoFrameAvailable)?;
        let params = self.parameters();

        let outcome = self.pipeline.detect(&frame, &params);
        let frame_jpeg_base64 = encoding::encode_jpeg_base64(&outcome.annotated, self.jpeg_quality)?;

        Ok(DetectionReport {
            detections: outcome.balls,
            frame_jpeg_base64,
            frame_sequence: frame.sequence(),
            captured_at: frame.captured_at(),
        })
    }

    /// Replace the parameter set used by subsequent detections.
    pub fn update_parameters(&self, params: DetectionParameters) -> Result<(), VisionError> {
        params.validate()?;
        info!(
            min_radius = params.min_radius,
            max_radius = params.max_radius,
            dp = params.dp,
            min_distance = params.min_distance,
            edge_threshold = params.edge_threshold,
            accumulator_threshold = params.accumulator_threshold,
            "Detection parameters updated"
        );
        *self.params.write() = params;
        Ok(())
    }

    pub fn parameters(&self) -> DetectionParameters {
        self.params.read().clone()
    }

    /// Latest raw frame as JPEG, for the preview stream
    pub fn latest_jpeg(&self, quality: u8) -> Result<Vec<u8>, VisionError> {
        let frame = self.store.snapshot().ok_or(VisionError::NoFrameAvailable)?;
        encoding::encode_jpeg(frame.image(), quality)
    }
}
