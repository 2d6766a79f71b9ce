//! Error types for GridRun

use thiserror::Error;

/// Result type alias using GridRun Error
pub type Result<T> = std::result::Result<T, Error>;

/// GridRun error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Integrity verification failed: {0}")]
    IntegrityError(String),
}

impl Error {
    /// Configuration and integrity failures halt the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvalidConfig(_) | Error::IntegrityError(_))
    }
}
