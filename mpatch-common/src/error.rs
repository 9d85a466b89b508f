//! Common error types for MusicPatch

use thiserror::Error;

/// Common result type for MusicPatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across MusicPatch services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(format!("Parse TOML failed: {}", e))
    }
}
