//! Error types for the device-grid runner

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error(transparent)]
    Common(#[from] gridrun_common::Error),

    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    #[error("Session close failed: {0}")]
    SessionClose(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Storage upload failed: {0}")]
    Storage(String),

    #[error("Job status update failed: {0}")]
    Reporting(String),

    #[error("Device matrix parse error: {0}")]
    MatrixParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether this error must halt the whole run rather than a single tuple
    pub fn is_fatal(&self) -> bool {
        match self {
            E2eError::Common(e) => e.is_fatal(),
            _ => false,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
