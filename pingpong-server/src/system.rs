//! The feeder as one running system: acquisition, detection on demand,
//! control-plane bridge with its sweep, and direct positioning.

use crate::hardware::Hardware;
use crate::settings::AppConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pingpong_core::{Error, Result};
use pingpong_eye::{AcquisitionStats, BallTracker, DetectionParameters, DetectionReport, FrameAcquisition, FrameStore};
use pingpong_motor::{
    shared, ActuatorState, BridgeHandle, BridgeStats, ControlBridge, ServoDriver, ServoPositioner,
    SharedActuatorState, SweepContext, SweepController, VariableStore, VariableValue,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Snapshot of the running system
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub camera: String,
    pub servo: String,
    pub frames_published: u64,
    pub frames_captured: u64,
    pub frames_missed: u64,
    pub actuator: ActuatorState,
    pub sweep_running: bool,
    pub control_polls: u64,
    pub failed_control_polls: u64,
    pub detection: DetectionParameters,
    pub shut_down: bool,
}

pub struct FeederSystem {
    store: Arc<FrameStore>,
    tracker: Arc<BallTracker>,
    acquisition: Mutex<Option<FrameAcquisition>>,
    acquisition_stats: Arc<AcquisitionStats>,
    bridge: Mutex<Option<BridgeHandle>>,
    bridge_stats: Arc<BridgeStats>,
    servo: Arc<dyn ServoDriver>,
    /// Held across direct writes and the release so neither interleaves
    servo_gate: Mutex<()>,
    positioner: ServoPositioner,
    variables: Arc<dyn VariableStore>,
    state: SharedActuatorState,
    camera_name: String,
    started_at: DateTime<Utc>,
    shut_down: AtomicBool,
}

impl FeederSystem {
    /// Start every background loop. Must be called inside a tokio runtime.
    pub fn start(config: &AppConfig, hardware: Hardware) -> Self {
        let Hardware {
            camera,
            servo,
            variables,
        } = hardware;
        let camera_name = camera.name().to_string();

        let store = Arc::new(FrameStore::new());
        let acquisition = FrameAcquisition::start(camera, store.clone(), config.vision.frame_interval());
        let acquisition_stats = acquisition.stats();
        let tracker = Arc::new(BallTracker::new(store.clone(), &config.vision));

        let state = shared(config.motor.initial_state);
        let context = SweepContext {
            driver: servo.clone(),
            state: state.clone(),
            calibration: config.motor.calibration,
            idle_interval: config.motor.poll_interval(),
            active_loops: Arc::new(AtomicUsize::new(0)),
        };
        let bridge = ControlBridge::new(variables.clone(), SweepController::new(context));
        let bridge_stats = bridge.stats();
        let bridge = bridge.spawn(config.motor.poll_interval());

        let positioner = ServoPositioner::new(servo.clone(), state.clone(), config.motor.calibration);

        info!(camera = %camera_name, servo = servo.name(), "Feeder system started");

        Self {
            store,
            tracker,
            acquisition: Mutex::new(Some(acquisition)),
            acquisition_stats,
            bridge: Mutex::new(Some(bridge)),
            bridge_stats,
            servo,
            servo_gate: Mutex::new(()),
            positioner,
            variables,
            state,
            camera_name,
            started_at: Utc::now(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Detect balls in the freshest frame.
    ///
    /// Fails with [`Error::Unavailable`] until the first frame arrives.
    pub async fn latest_detections(&self) -> Result<DetectionReport> {
        let tracker = self.tracker.clone();
        let report = tokio::task::spawn_blocking(move || tracker.latest_detections())
            .await
            .map_err(|e| Error::Internal(format!("Detection task failed: {}", e)))??;
        Ok(report)
    }

    pub fn update_detection_parameters(&self, params: DetectionParameters) -> Result<()> {
        self.tracker.update_parameters(params)?;
        Ok(())
    }

    pub fn detection_parameters(&self) -> DetectionParameters {
        self.tracker.parameters()
    }

    /// Move the servo directly. Returns the commanded duty cycle.
    ///
    /// Fails with [`Error::Unavailable`] once the system is shut down and
    /// the servo released.
    pub fn set_actuator_angle(&self, angle: i32) -> Result<f64> {
        let _gate = self.servo_gate.lock();
        if self.is_shut_down() {
            return Err(Error::Unavailable("Feeder system is shut down".to_string()));
        }
        Ok(self.positioner.set_angle(angle)?)
    }

    /// Write one control-plane variable. The bridge picks it up on its
    /// next poll.
    pub fn write_control_variable(&self, name: &str, value: VariableValue) -> Result<()> {
        self.variables.write_variable(name, value)?;
        info!(variable = name, %value, "Control variable written");
        Ok(())
    }

    pub fn control_variables(&self) -> Vec<(String, VariableValue)> {
        self.variables.variables()
    }

    /// Latest raw frame as JPEG
    pub async fn latest_frame_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let tracker = self.tracker.clone();
        let jpeg = tokio::task::spawn_blocking(move || tracker.latest_jpeg(quality))
            .await
            .map_err(|e| Error::Internal(format!("Encoding task failed: {}", e)))??;
        Ok(jpeg)
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds(),
            camera: self.camera_name.clone(),
            servo: self.servo.name().to_string(),
            frames_published: self.store.published_count(),
            frames_captured: self.acquisition_stats.captured(),
            frames_missed: self.acquisition_stats.missed(),
            actuator: *self.state.read(),
            sweep_running: self.bridge_stats.sweep_running(),
            control_polls: self.bridge_stats.polls(),
            failed_control_polls: self.bridge_stats.failed_polls(),
            detection: self.detection_parameters(),
            shut_down: self.is_shut_down(),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop the bridge (and its sweep), release the servo, then stop
    /// acquisition. Later calls are no-ops.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down feeder system");

        let bridge = self.bridge.lock().take();
        if let Some(mut bridge) = bridge {
            bridge.shutdown().await;
        }

        {
            let _gate = self.servo_gate.lock();
            if let Err(e) = self.servo.release() {
                error!("Failed to release servo '{}': {}", self.servo.name(), e);
            }
        }

        let acquisition = self.acquisition.lock().take();
        if let Some(mut acquisition) = acquisition {
            acquisition.stop().await;
        }

        info!("Feeder system stopped");
    }
}
