//! Direct servo positioning, independent of the sweep

use crate::calibration::ServoCalibration;
use crate::driver::ServoDriver;
use crate::error::MotorError;
use crate::state::SharedActuatorState;
use std::sync::Arc;
use tracing::info;

pub struct ServoPositioner {
    driver: Arc<dyn ServoDriver>,
    state: SharedActuatorState,
    calibration: ServoCalibration,
}

impl ServoPositioner {
    pub fn new(driver: Arc<dyn ServoDriver>, state: SharedActuatorState, calibration: ServoCalibration) -> Self {
        Self {
            driver,
            state,
            calibration,
        }
    }

    /// Move the servo to `angle` and return the commanded duty.
    ///
    /// The angle must lie within the current sweep bounds and the
    /// calibrated range, both inclusive.
    pub fn set_angle(&self, angle: i32) -> Result<f64, MotorError> {
        let state = *self.state.read();
        let min = (state.min_angle as f64).max(self.calibration.min_angle);
        let max = (state.max_angle as f64).min(self.calibration.max_angle);

        if !state.contains_angle(angle) || !self.calibration.contains(angle as f64) {
            return Err(MotorError::AngleOutOfRange {
                angle,
                min: min.ceil() as i32,
                max: max.floor() as i32,
            });
        }

        let duty = self.calibration.angle_to_duty(angle as f64);
        self.driver.set_duty_cycle(duty)?;
        info!(angle, duty, "Servo positioned");
        Ok(duty)
    }
}
