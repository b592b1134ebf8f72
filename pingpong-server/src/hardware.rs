//! Hardware capabilities, selected once at startup

use crate::settings::AppConfig;
use pingpong_core::Result;
use pingpong_eye::{camera, Camera};
use pingpong_motor::{driver, InMemoryVariableStore, ServoDriver, VariableStore};
use std::sync::Arc;
use tracing::info;

/// Everything the feeder talks to outside the process.
pub struct Hardware {
    pub camera: Box<dyn Camera>,
    pub servo: Arc<dyn ServoDriver>,
    pub variables: Arc<dyn VariableStore>,
}

impl Hardware {
    /// Open the camera and servo backends named by `config`. The control
    /// variables are seeded from `motor.initial_state`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let camera = camera::open(&config.vision)?;
        let servo = driver::open(&config.motor.driver, &config.motor.calibration)?;
        let variables: Arc<dyn VariableStore> = Arc::new(InMemoryVariableStore::with_actuator_state(
            &config.motor.initial_state,
        ));

        info!(camera = camera.name(), servo = servo.name(), "Hardware ready");
        Ok(Self {
            camera,
            servo,
            variables,
        })
    }

    /// Assemble from already opened parts.
    pub fn new(camera: Box<dyn Camera>, servo: Arc<dyn ServoDriver>, variables: Arc<dyn VariableStore>) -> Self {
        Self {
            camera,
            servo,
            variables,
        }
    }
}
