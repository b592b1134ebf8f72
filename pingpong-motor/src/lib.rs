//! pingpong-motor: actuator side of the ball feeder
//!
//! A sweep loop drives the servo back and forth between two angles at a
//! configurable speed. A control-plane bridge polls externally writable
//! variables and starts or stops the sweep accordingly.

pub mod error;
pub mod config;
pub mod calibration;
pub mod state;
pub mod driver;
pub mod control_plane;
pub mod sweep;
pub mod bridge;
pub mod positioning;

pub use error::MotorError;
pub use config::{DriverConfig, MotorConfig};
pub use calibration::ServoCalibration;
pub use state::{shared, ActuatorState, SharedActuatorState};
pub use driver::{ServoDriver, SimulatedServo, SysfsPwm};
pub use control_plane::{InMemoryVariableStore, VariableStore, VariableValue};
pub use sweep::{SweepContext, SweepHandle};
pub use bridge::{BridgeHandle, BridgeStats, ControlBridge, SweepController, Transition};
pub use positioning::ServoPositioner;
