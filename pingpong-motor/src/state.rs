//! Shared actuator state

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Sweep settings as last read from the control plane.
///
/// Written by the control-plane bridge, read by the sweep loop once per
/// sweep cycle and by direct positioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorState {
    pub enabled: bool,
    /// 0 (slowest) to 100 (no delay between steps)
    pub speed_percent: u8,
    pub min_angle: i32,
    pub max_angle: i32,
}

impl Default for ActuatorState {
    fn default() -> Self {
        Self {
            enabled: false,
            speed_percent: 50,
            min_angle: -45,
            max_angle: 45,
        }
    }
}

impl ActuatorState {
    /// Delay between sweep steps: `100 - speed_percent` milliseconds
    pub fn step_delay(&self) -> Duration {
        let speed = self.speed_percent.min(100) as u64;
        Duration::from_millis(100 - speed)
    }

    /// Inclusive check against the configured sweep bounds
    pub fn contains_angle(&self, angle: i32) -> bool {
        angle >= self.min_angle && angle <= self.max_angle
    }
}

pub type SharedActuatorState = Arc<RwLock<ActuatorState>>;

pub fn shared(state: ActuatorState) -> SharedActuatorState {
    Arc::new(RwLock::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let state = ActuatorState::default();
        assert!(!state.enabled);
        assert_eq!(state.speed_percent, 50);
        assert_eq!((state.min_angle, state.max_angle), (-45, 45));
    }

    #[test]
    fn test_step_delay() {
        let mut state = ActuatorState::default();
        assert_eq!(state.step_delay(), Duration::from_millis(50));
        state.speed_percent = 100;
        assert_eq!(state.step_delay(), Duration::ZERO);
        state.speed_percent = 0;
        assert_eq!(state.step_delay(), Duration::from_millis(100));
        state.speed_percent = 250;
        assert_eq!(state.step_delay(), Duration::ZERO);
    }

    #[test]
    fn test_contains_angle_inclusive() {
        let state = ActuatorState::default();
        assert!(state.contains_angle(-45));
        assert!(state.contains_angle(45));
        assert!(state.contains_angle(0));
        assert!(!state.contains_angle(46));
        assert!(!state.contains_angle(-46));
    }
}
