//! Configuration sections shared by every feeder binary

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Delay between MJPEG preview frames in milliseconds
    pub stream_interval_ms: u64,
    /// JPEG quality of the MJPEG preview (1-100)
    pub stream_jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            stream_interval_ms: 16,
            stream_jpeg_quality: 80,
        }
    }
}

impl ServerConfig {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Server host must not be empty".to_string());
        }
        if self.stream_interval_ms == 0 {
            return Err("Stream interval must be greater than 0".to_string());
        }
        if self.stream_jpeg_quality == 0 || self.stream_jpeg_quality > 100 {
            return Err("Stream JPEG quality must be between 1 and 100".to_string());
        }
        Ok(())
    }

    /// `host:port` string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Load a configuration tree in layers: `defaults`, then the optional file at
/// `path`, then `{env_prefix}__SECTION__KEY` environment variables.
///
/// A `path` that is given but missing is an error; no path means defaults
/// plus environment only.
pub fn load_layered<T>(defaults: &T, path: Option<&Path>, env_prefix: &str) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut builder = config::Config::builder().add_source(config::Config::try_from(defaults)?);

    if let Some(path) = path {
        if !path.exists() {
            return Err(Error::Configuration(format!(
                "Config file '{}' not found",
                path.display()
            )));
        }
        debug!("Loading configuration from {}", path.display());
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(env_prefix)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let settings = builder.build()?;
    Ok(settings.try_deserialize::<T>()?)
}
