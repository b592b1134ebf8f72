//! pingpong-core: shared building blocks for the ball feeder
//!
//! Provides:
//! - The facade error type every domain crate converts into
//! - Server and logging configuration sections
//! - Layered configuration loading (defaults, TOML file, environment)

pub mod error;
pub mod config;

pub use error::{Error, Result};
pub use config::{load_layered, LoggingConfig, LogFormat, ServerConfig};
