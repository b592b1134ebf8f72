//! Configuration for pingpong-motor

use crate::calibration::ServoCalibration;
use crate::state::ActuatorState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// PWM backend, chosen once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverConfig {
    /// Records commands in memory
    Simulated {
        #[serde(default = "default_history")]
        history: usize,
    },
    /// Linux sysfs PWM channel (`<root>/pwmchip<chip>/pwm<channel>`)
    Sysfs {
        #[serde(default = "default_sysfs_root")]
        root: PathBuf,
        chip: u32,
        channel: u32,
    },
}

fn default_history() -> usize {
    4096
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/class/pwm")
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig::Simulated {
            history: default_history(),
        }
    }
}

/// Motor subsystem configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    pub driver: DriverConfig,
    pub calibration: ServoCalibration,
    /// Control-plane poll period in milliseconds
    pub poll_interval_ms: u64,
    /// Control variables registered at startup
    pub initial_state: ActuatorState,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            driver: DriverConfig::default(),
            calibration: ServoCalibration::default(),
            poll_interval_ms: 100,
            initial_state: ActuatorState::default(),
        }
    }
}

impl MotorConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.calibration.validate()?;

        if self.poll_interval_ms == 0 {
            return Err("Poll interval must be greater than 0".to_string());
        }
        if self.poll_interval_ms > 60_000 {
            return Err("Poll interval cannot exceed 60000 ms".to_string());
        }

        if self.initial_state.speed_percent > 100 {
            return Err("Initial speed_percent must be between 0 and 100".to_string());
        }

        if let DriverConfig::Simulated { history } = self.driver {
            if history == 0 {
                return Err("Simulated driver history must be greater than 0".to_string());
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
