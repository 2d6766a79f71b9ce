//! Harness configuration
//!
//! The harness binary reads its flags and environment once at process start
//! and builds a [`HarnessConfig`], which is then handed to each component.
//! The helpers here normalize the raw values it collects.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result, DEFAULT_GRID_HOST, DEFAULT_GRID_PORT, DEFAULT_REST_ENDPOINT};

/// Environment variable holding the artifact path
pub const ENV_ARTIFACT: &str = "APP_ZIP";
/// Environment variable holding the account name
pub const ENV_USERNAME: &str = "SAUCE_USERNAME";
/// Environment variable holding the account access key
pub const ENV_ACCESS_KEY: &str = "SAUCE_ACCESS_KEY";
/// Environment variable holding the optional build tag
pub const ENV_BUILD_TAG: &str = "BUILD_TAG";
/// Environment variable set by a local tunnel plugin in CI
pub const ENV_PROXY_PORT: &str = "SELENIUM_PORT";

/// Account credentials for the grid and its REST API
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub access_key: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            access_key: access_key.into(),
        }
    }

    /// Build credentials from optional account values; both are required
    pub fn from_parts(username: Option<String>, access_key: Option<String>) -> Result<Self> {
        let username = non_blank(username).ok_or_else(|| missing(ENV_USERNAME))?;
        let access_key = non_blank(access_key).ok_or_else(|| missing(ENV_ACCESS_KEY))?;
        Ok(Self::new(username, access_key))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Local path of the application binary to upload
    pub artifact_path: Option<PathBuf>,

    /// Grid account
    pub credentials: Credentials,

    /// Build tag attached to every session
    pub build_tag: Option<String>,

    /// Local tunnel port; when set the grid is reached through loopback
    pub proxy_port: Option<u16>,

    /// Public grid host
    pub grid_host: String,

    /// Public grid port
    pub grid_port: u16,

    /// REST API root (storage and job status)
    pub rest_endpoint: String,

    /// Number of concurrent workers
    pub workers: usize,

    /// Timeout applied to every network call
    pub request_timeout: Duration,
}

impl HarnessConfig {
    /// Build a configuration with defaults for everything but the account
    pub fn new(credentials: Credentials) -> Self {
        Self {
            artifact_path: None,
            credentials,
            build_tag: None,
            proxy_port: None,
            grid_host: DEFAULT_GRID_HOST.to_string(),
            grid_port: DEFAULT_GRID_PORT,
            rest_endpoint: DEFAULT_REST_ENDPOINT.to_string(),
            workers: 4,
            request_timeout: Duration::from_secs(300),
        }
    }
}

/// Treat unset and whitespace-only values alike
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse the tunnel port; blank means no tunnel
pub fn parse_proxy_port(raw: Option<String>) -> Result<Option<u16>> {
    match non_blank(raw) {
        Some(raw) => raw.trim().parse::<u16>().map(Some).map_err(|_| {
            Error::InvalidConfig(format!("{} must be a port number, got {:?}", ENV_PROXY_PORT, raw))
        }),
        None => Ok(None),
    }
}

fn missing(key: &str) -> Error {
    Error::InvalidConfig(format!(
        "{key} is not set. Export your grid account before running:\n$ export {key}=<value>"
    ))
}
