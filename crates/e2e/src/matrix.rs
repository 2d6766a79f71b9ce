//! Device matrix
//!
//! The fixed list of devices every test runs against. The built-in matrix
//! mirrors the CI setup; a YAML file can replace it.

use std::path::Path;

use gridrun_common::{CapabilityTuple, DeviceTarget, Orientation};
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// An ordered list of device targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    pub devices: Vec<DeviceTarget>,
}

impl Matrix {
    /// The built-in two-device iOS matrix
    pub fn hard_coded() -> Self {
        Self {
            devices: vec![
                ios_device("iPhone 6", "8.4", "1.4.11"),
                ios_device("iPhone 6 Plus", "8.4", "1.4.12"),
            ],
        }
    }

    /// Parse a matrix from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let matrix: Self = serde_yaml::from_str(yaml)?;
        if matrix.devices.is_empty() {
            return Err(E2eError::MatrixParse("matrix lists no devices".to_string()));
        }
        Ok(matrix)
    }

    /// Parse a matrix from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::MatrixParse(format!("{}: {}", path.display(), e)))
    }

    /// Parameter tuples for one test, in declaration order
    pub fn enumerate(&self, test_name: &str) -> Vec<CapabilityTuple> {
        self.devices.iter().map(|d| d.for_test(test_name)).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::hard_coded()
    }
}

fn ios_device(device_name: &str, platform_version: &str, appium_version: &str) -> DeviceTarget {
    DeviceTarget {
        platform_name: "iOS".to_string(),
        device_name: device_name.to_string(),
        platform_version: platform_version.to_string(),
        browser_name: String::new(),
        orientation: Orientation::Portrait,
        appium_version: appium_version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, "iPhone 6", "8.4", "1.4.11" ; "first row")]
    #[test_case(1, "iPhone 6 Plus", "8.4", "1.4.12" ; "second row")]
    fn test_hard_coded_rows(index: usize, device: &str, version: &str, appium: &str) {
        let tuples = Matrix::hard_coded().enumerate("launchTest");
        let tuple = &tuples[index];

        assert_eq!(tuple.platform_name, "iOS");
        assert_eq!(tuple.device_name, device);
        assert_eq!(tuple.platform_version, version);
        assert_eq!(tuple.browser_name, "");
        assert_eq!(tuple.orientation, Orientation::Portrait);
        assert_eq!(tuple.driver_version, appium);
        assert_eq!(tuple.test_name, "launchTest");
    }

    #[test]
    fn test_same_test_name_rows_are_distinct() {
        let tuples = Matrix::hard_coded().enumerate("addSumTest");
        assert_eq!(tuples.len(), 2);
        let key = |t: &CapabilityTuple| {
            (t.device_name.clone(), t.platform_version.clone(), t.driver_version.clone())
        };
        assert_ne!(key(&tuples[0]), key(&tuples[1]));
    }

    #[test]
    fn test_enumerate_is_restartable() {
        let matrix = Matrix::hard_coded();
        assert_eq!(matrix.enumerate("t"), matrix.enumerate("t"));
    }

    #[test]
    fn test_parse_yaml_matrix() {
        let yaml = r#"
devices:
  - platform_name: Android
    device_name: Samsung Galaxy S4 Emulator
    platform_version: "4.4"
    orientation: LANDSCAPE
    appium_version: 1.4.13
  - platform_name: iOS
    device_name: iPad Air
    platform_version: "9.0"
    appium_version: 1.4.13
"#;
        let matrix = Matrix::from_yaml(yaml).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.devices[0].orientation, Orientation::Landscape);
        assert_eq!(matrix.devices[1].orientation, Orientation::Portrait);
        assert_eq!(matrix.devices[1].platform_version, "9.0");
    }

    #[test]
    fn test_empty_matrix_is_rejected() {
        let err = Matrix::from_yaml("devices: []").unwrap_err();
        assert!(matches!(err, E2eError::MatrixParse(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.yaml");
        std::fs::write(&path, serde_yaml::to_string(&Matrix::hard_coded()).unwrap()).unwrap();
        assert_eq!(Matrix::from_file(&path).unwrap(), Matrix::hard_coded());
    }
}
