//! Servo angle to PWM duty cycle mapping

use serde::{Deserialize, Serialize};

/// Duty values are handled in tenths of a percent, the sweep's step size.
const TENTHS: f64 = 10.0;
/// Slack for float noise when rounding a bound to tenths
const ROUNDING_SLACK: f64 = 1e-9;

/// Affine mapping from servo angle (degrees) to duty cycle (percent).
///
/// The default fits a hobby servo at 50 Hz: -60° → 2.5 %, +60° → 12.5 %.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoCalibration {
    pub min_angle: f64,
    pub max_angle: f64,
    pub min_duty: f64,
    pub max_duty: f64,
    pub pwm_frequency_hz: f64,
}

impl Default for ServoCalibration {
    fn default() -> Self {
        Self {
            min_angle: -60.0,
            max_angle: 60.0,
            min_duty: 2.5,
            max_duty: 12.5,
            pwm_frequency_hz: 50.0,
        }
    }
}

impl ServoCalibration {
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            self.min_angle,
            self.max_angle,
            self.min_duty,
            self.max_duty,
            self.pwm_frequency_hz,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err("Calibration values must be finite".to_string());
        }
        if self.min_angle >= self.max_angle {
            return Err("Calibration min_angle must be below max_angle".to_string());
        }
        if self.min_duty < 0.0 || self.max_duty > 100.0 || self.min_duty >= self.max_duty {
            return Err("Calibration duty range must satisfy 0 <= min_duty < max_duty <= 100".to_string());
        }
        if self.pwm_frequency_hz <= 0.0 || self.pwm_frequency_hz > 10_000.0 {
            return Err("PWM frequency must be in (0, 10000] Hz".to_string());
        }
        Ok(())
    }

    pub fn angle_to_duty(&self, angle: f64) -> f64 {
        self.min_duty
            + (angle - self.min_angle) * (self.max_duty - self.min_duty)
                / (self.max_angle - self.min_angle)
    }

    fn clamp_angle(&self, angle: f64) -> f64 {
        angle.clamp(self.min_angle, self.max_angle)
    }

    /// Inclusive range check against the mechanical limits
    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min_angle && angle <= self.max_angle
    }

    /// Sweep bounds for `[min_angle, max_angle]` in tenths of a percent duty,
    /// rounded inwards. Angles outside the calibrated range are clamped to it.
    /// `None` when the range holds no step.
    pub fn ramp_tenths(&self, min_angle: i32, max_angle: i32) -> Option<(u32, u32)> {
        if min_angle > max_angle {
            return None;
        }
        let low = self.angle_to_duty(self.clamp_angle(min_angle as f64)) * TENTHS;
        let high = self.angle_to_duty(self.clamp_angle(max_angle as f64)) * TENTHS;
        let low = (low - ROUNDING_SLACK).ceil().max(0.0);
        let high = (high + ROUNDING_SLACK).floor();
        if high < low {
            return None;
        }
        Some((low as u32, high as u32))
    }

    pub fn period_ns(&self) -> u64 {
        (1e9 / self.pwm_frequency_hz).round() as u64
    }

    /// High time within one period for a duty cycle in percent
    pub fn duty_to_ns(&self, duty_percent: f64) -> u64 {
        let duty = duty_percent.clamp(0.0, 100.0);
        (self.period_ns() as f64 * duty / 100.0).round() as u64
    }
}

/// Duty for a step expressed in tenths of a percent
pub fn tenths_to_duty(tenths: u32) -> f64 {
    tenths as f64 / TENTHS
}
