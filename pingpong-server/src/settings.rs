//! Application configuration: one tree for every subsystem

use pingpong_core::{load_layered, Error, LoggingConfig, Result, ServerConfig};
use pingpong_eye::{CameraSource, VisionConfig};
use pingpong_motor::{DriverConfig, MotorConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment overrides, e.g. `PINGPONG__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "PINGPONG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub vision: VisionConfig,
    pub motor: MotorConfig,
}

impl AppConfig {
    /// Defaults, then the optional TOML file, then `PINGPONG__*` variables.
    /// The merged tree is validated before it is returned.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: AppConfig = load_layered(&AppConfig::default(), path, ENV_PREFIX)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.server
            .validate()
            .map_err(|e| Error::Configuration(format!("server: {}", e)))?;
        self.vision
            .validate()
            .map_err(|e| Error::Configuration(format!("vision: {}", e)))?;
        self.motor
            .validate()
            .map_err(|e| Error::Configuration(format!("motor: {}", e)))?;
        Ok(())
    }

    /// Swap both hardware backends for their simulated counterparts.
    pub fn simulated(mut self) -> Self {
        self.vision.camera = CameraSource::Synthetic;
        self.motor.driver = DriverConfig::default();
        self
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.vision.camera, CameraSource::Synthetic)
            && matches!(self.motor.driver, DriverConfig::Simulated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid_and_simulated() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_simulated());
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[vision]
frame_rate = 15

[vision.detection]
min_radius = 10
max_radius = 40

[motor]
poll_interval_ms = 50

[motor.driver]
kind = "sysfs"
chip = 0
channel = 1
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.vision.frame_rate, 15);
        assert_eq!(config.vision.detection.min_radius, 10);
        assert_eq!(config.vision.detection.max_radius, 40);
        assert_eq!(config.motor.poll_interval_ms, 50);
        assert!(matches!(
            config.motor.driver,
            DriverConfig::Sysfs { chip: 0, channel: 1, .. }
        ));
        assert!(!config.is_simulated());
        // Untouched sections keep their defaults
        assert_eq!(config.server.stream_jpeg_quality, 80);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[vision]\nframe_rate = 0").unwrap();

        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref msg) if msg.starts_with("vision:")));
    }

    #[test]
    fn test_simulated_replaces_hardware_backends() {
        let mut config = AppConfig::default();
        config.vision.camera = CameraSource::Device { index: 0 };
        config.motor.driver = DriverConfig::Sysfs {
            root: "/sys/class/pwm".into(),
            chip: 0,
            channel: 0,
        };
        assert!(!config.is_simulated());
        assert!(config.simulated().is_simulated());
    }
}
