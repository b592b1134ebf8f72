//! Error types for pingpong-motor

use pingpong_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotorError {
    #[error("Angle out of range: {angle} not in [{min}, {max}]")]
    AngleOutOfRange { angle: i32, min: i32, max: i32 },

    #[error("Hardware error: {0}")]
    Hardware(String),

    #[error("Control plane error: {0}")]
    ControlPlane(String),

    #[error("Unknown control variable: {0}")]
    UnknownVariable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MotorError> for CoreError {
    fn from(err: MotorError) -> Self {
        match err {
            MotorError::AngleOutOfRange { .. }
            | MotorError::UnknownVariable(_)
            | MotorError::Validation(_) => CoreError::InvalidInput(err.to_string()),
            MotorError::Hardware(_) => CoreError::Hardware(err.to_string()),
            MotorError::Config(_) => CoreError::Configuration(err.to_string()),
            MotorError::Io(e) => CoreError::Io(e),
            MotorError::ControlPlane(_) => CoreError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_error_message() {
        let err = MotorError::AngleOutOfRange {
            angle: 70,
            min: -45,
            max: 45,
        };
        let msg = err.to_string();
        assert!(msg.contains("out of range"));
        assert!(msg.contains("70"));
    }

    #[test]
    fn test_to_core_error() {
        let err: CoreError = MotorError::AngleOutOfRange {
            angle: 70,
            min: -45,
            max: 45,
        }
        .into();
        assert!(matches!(err, CoreError::InvalidInput(_)));

        let err: CoreError = MotorError::Hardware("pwm".to_string()).into();
        assert!(matches!(err, CoreError::Hardware(_)));

        let err: CoreError = MotorError::UnknownVariable("foo".to_string()).into();
        assert_eq!(err.code(), "INVALID_INPUT");
    }
}
