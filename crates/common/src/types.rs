//! Core types for GridRun

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Device orientation requested for a session. Serialized lowercase; read in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::Portrait
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Self::Portrait),
            "landscape" => Ok(Self::Landscape),
            other => Err(format!("unknown orientation {:?}, expected portrait or landscape", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Orientation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => f.write_str("portrait"),
            Orientation::Landscape => f.write_str("landscape"),
        }
    }
}

/// One row of the device matrix, independent of the test it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTarget {
    pub platform_name: String,
    pub device_name: String,
    pub platform_version: String,
    #[serde(default)]
    pub browser_name: String,
    #[serde(default)]
    pub orientation: Orientation,
    pub appium_version: String,
}

impl DeviceTarget {
    /// Bind this device row to a test name
    pub fn for_test(&self, test_name: &str) -> CapabilityTuple {
        CapabilityTuple {
            platform_name: self.platform_name.clone(),
            device_name: self.device_name.clone(),
            platform_version: self.platform_version.clone(),
            browser_name: self.browser_name.clone(),
            orientation: self.orientation,
            driver_version: self.appium_version.clone(),
            test_name: test_name.to_string(),
        }
    }
}

/// A single parameter tuple handed to one test invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTuple {
    pub platform_name: String,
    pub device_name: String,
    pub platform_version: String,
    pub browser_name: String,
    pub orientation: Orientation,
    pub driver_version: String,
    pub test_name: String,
}

impl fmt::Display for CapabilityTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{} {} {} appium {}]",
            self.test_name, self.platform_name, self.device_name, self.platform_version, self.driver_version
        )
    }
}

/// Capabilities sent to the grid when opening a session.
///
/// Field names are the grid's wire keys; `build` is only emitted when a build
/// tag is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub platform_name: String,
    pub device_name: String,
    pub platform_version: String,
    pub app: String,
    pub browser_name: String,
    pub device_orientation: Orientation,
    pub appium_version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

impl Capabilities {
    pub fn from_tuple(tuple: &CapabilityTuple, app: &str, build: Option<&str>) -> Self {
        Self {
            platform_name: tuple.platform_name.clone(),
            device_name: tuple.device_name.clone(),
            platform_version: tuple.platform_version.clone(),
            app: app.to_string(),
            browser_name: tuple.browser_name.clone(),
            device_orientation: tuple.orientation,
            appium_version: tuple.driver_version.clone(),
            name: tuple.test_name.clone(),
            build: build.map(str::to_string),
        }
    }
}

/// Session identifier assigned by the grid
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
