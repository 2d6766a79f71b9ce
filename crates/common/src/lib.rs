//! GridRun Common Library
//!
//! Shared configuration, credentials, digest and capability types for the
//! GridRun device-grid harness.

pub mod config;
pub mod digest;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Credentials, HarnessConfig};
pub use digest::{digest_file, DigestAlgorithm, FileDigest};
pub use error::{Error, Result};
pub use types::*;

/// GridRun version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Public grid host used when no local tunnel port is configured
pub const DEFAULT_GRID_HOST: &str = "ondemand.saucelabs.com";

/// Public grid port
pub const DEFAULT_GRID_PORT: u16 = 80;

/// REST API root for storage uploads and job status updates
pub const DEFAULT_REST_ENDPOINT: &str = "https://saucelabs.com";

/// Scheme the grid resolves uploaded artifacts through
pub const STORAGE_SCHEME: &str = "sauce-storage";

/// Remediation hint shown whenever the artifact location is unusable
pub const ARTIFACT_HINT: &str = "Please set your APP Zip file location in APP_ZIP environment variable and try again!\n\
     $ export APP_ZIP=<full path to app zip file>";
