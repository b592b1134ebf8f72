use thiserror::Error;

/// Error surfaced by the feeder's public operations.
///
/// Domain crates keep their own error enums and convert into this one at the
/// facade, so callers only have to distinguish the categories below.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A read arrived before the resource it needs exists (e.g. no frame yet).
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Caller input was rejected; nothing was applied.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Hardware error: {0}")]
    Hardware(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "IO_ERROR",
            Error::Unavailable(_) => "UNAVAILABLE",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Hardware(_) => "HARDWARE_ERROR",
            Error::Configuration(_) => "CONFIGURATION_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
