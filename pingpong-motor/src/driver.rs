//! Servo PWM drivers

use crate::calibration::ServoCalibration;
use crate::config::DriverConfig;
use crate::error::MotorError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Duty-cycle output to a servo.
///
/// Shared between the sweep loop and direct positioning, so commands take
/// `&self`. A duty of 0 puts the servo in its neutral (unpowered) state.
pub trait ServoDriver: Send + Sync {
    /// Command a duty cycle in percent of the PWM period
    fn set_duty_cycle(&self, duty_percent: f64) -> Result<(), MotorError>;

    /// Neutralize and hand the channel back to the system
    fn release(&self) -> Result<(), MotorError>;

    fn name(&self) -> &str;
}

/// Open the driver selected by configuration.
pub fn open(config: &DriverConfig, calibration: &ServoCalibration) -> Result<Arc<dyn ServoDriver>, MotorError> {
    let driver: Arc<dyn ServoDriver> = match config {
        DriverConfig::Simulated { history } => Arc::new(SimulatedServo::new(*history)),
        DriverConfig::Sysfs {
            root,
            chip,
            channel,
        } => Arc::new(SysfsPwm::open(root, *chip, *channel, calibration)?),
    };
    info!("Servo driver '{}' ready", driver.name());
    Ok(driver)
}

#[derive(Debug, Default)]
struct SimulatedInner {
    history: VecDeque<f64>,
    commands: u64,
    released: bool,
}

/// In-memory servo that records every duty command.
///
/// History is bounded; the oldest commands are dropped first. For tests a
/// fault can be injected at the n-th command (1-based).
#[derive(Debug)]
pub struct SimulatedServo {
    inner: Mutex<SimulatedInner>,
    capacity: Option<usize>,
    fail_at: Option<u64>,
}

impl SimulatedServo {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(SimulatedInner::default()),
            capacity: Some(capacity.max(1)),
            fail_at: None,
        }
    }

    /// Keep every command
    pub fn unbounded() -> Self {
        Self {
            inner: Mutex::new(SimulatedInner::default()),
            capacity: None,
            fail_at: None,
        }
    }

    /// Fail the n-th command with a hardware error
    pub fn failing_at(mut self, command: u64) -> Self {
        self.fail_at = Some(command);
        self
    }

    pub fn history(&self) -> Vec<f64> {
        self.inner.lock().history.iter().copied().collect()
    }

    pub fn last_duty(&self) -> Option<f64> {
        self.inner.lock().history.back().copied()
    }

    /// Commands attempted, including a failed one
    pub fn commands_sent(&self) -> u64 {
        self.inner.lock().commands
    }

    pub fn is_released(&self) -> bool {
        self.inner.lock().released
    }

    fn record(&self, inner: &mut SimulatedInner, duty_percent: f64) {
        if let Some(capacity) = self.capacity {
            if inner.history.len() >= capacity {
                inner.history.pop_front();
            }
        }
        inner.history.push_back(duty_percent);
    }
}

impl ServoDriver for SimulatedServo {
    fn set_duty_cycle(&self, duty_percent: f64) -> Result<(), MotorError> {
        let mut inner = self.inner.lock();
        inner.commands += 1;
        if self.fail_at == Some(inner.commands) {
            return Err(MotorError::Hardware(format!(
                "Simulated fault at command {}",
                inner.commands
            )));
        }
        self.record(&mut inner, duty_percent);
        Ok(())
    }

    fn release(&self) -> Result<(), MotorError> {
        let mut inner = self.inner.lock();
        self.record(&mut inner, 0.0);
        inner.released = true;
        debug!("Simulated servo released");
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// Linux sysfs PWM channel.
///
/// Layout: `<root>/pwmchipN/{export,unexport}` and
/// `<root>/pwmchipN/pwmM/{period,duty_cycle,enable}`, times in nanoseconds.
#[derive(Debug)]
pub struct SysfsPwm {
    chip_dir: PathBuf,
    channel_dir: PathBuf,
    channel: u32,
    calibration: ServoCalibration,
    label: String,
    released: Mutex<bool>,
}

impl SysfsPwm {
    pub fn open(root: &Path, chip: u32, channel: u32, calibration: &ServoCalibration) -> Result<Self, MotorError> {
        let chip_dir = root.join(format!("pwmchip{}", chip));
        if !chip_dir.is_dir() {
            return Err(MotorError::Hardware(format!(
                "PWM chip not found: {}",
                chip_dir.display()
            )));
        }

        let channel_dir = chip_dir.join(format!("pwm{}", channel));
        if !channel_dir.is_dir() {
            write_attr(&chip_dir.join("export"), channel)?;
            if !channel_dir.is_dir() {
                return Err(MotorError::Hardware(format!(
                    "PWM channel {} did not appear after export",
                    channel
                )));
            }
        }

        let pwm = Self {
            chip_dir,
            channel_dir,
            channel,
            calibration: *calibration,
            label: format!("sysfs:pwmchip{}/pwm{}", chip, channel),
            released: Mutex::new(false),
        };

        pwm.write("duty_cycle", 0)?;
        pwm.write("period", calibration.period_ns())?;
        pwm.write("enable", 1)?;
        info!(
            "PWM {} enabled at {} Hz",
            pwm.label, calibration.pwm_frequency_hz
        );
        Ok(pwm)
    }

    fn write(&self, attribute: &str, value: impl std::fmt::Display) -> Result<(), MotorError> {
        write_attr(&self.channel_dir.join(attribute), value)
    }
}

fn write_attr(path: &Path, value: impl std::fmt::Display) -> Result<(), MotorError> {
    fs::write(path, value.to_string())
        .map_err(|e| MotorError::Hardware(format!("Failed to write {}: {}", path.display(), e)))
}

impl ServoDriver for SysfsPwm {
    fn set_duty_cycle(&self, duty_percent: f64) -> Result<(), MotorError> {
        if *self.released.lock() {
            return Err(MotorError::Hardware(format!("{} already released", self.label)));
        }
        self.write("duty_cycle", self.calibration.duty_to_ns(duty_percent))
    }

    fn release(&self) -> Result<(), MotorError> {
        let mut released = self.released.lock();
        if *released {
            return Ok(());
        }
        self.write("duty_cycle", 0)?;
        self.write("enable", 0)?;
        if let Err(e) = write_attr(&self.chip_dir.join("unexport"), self.channel) {
            warn!("Failed to unexport {}: {}", self.label, e);
        }
        *released = true;
        info!("PWM {} released", self.label);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}
