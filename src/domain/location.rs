//! Location references of the form `[device:]path`.
//!
//! The resolver is intentionally lenient: it only splits on the first `:`.
//! An empty device (`":/flash/a"`) is passed through as-is, so callers must
//! cope with `Some("")`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A local path, a device root, or a path on a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Serial port the device is attached to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Path, either local or on the device filesystem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Field a bare string (no `:`) is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultField {
    #[default]
    Path,
    Device,
}

/// Caller input: either a raw string still to be split or an already
/// resolved location, which is returned unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationArg {
    Raw(String),
    Resolved(Location),
}

impl Location {
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            device: None,
            path: Some(path.into()),
        }
    }

    pub fn device(device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            path: None,
        }
    }

    pub fn on_device(device: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            path: Some(path.into()),
        }
    }

    /// Port of the serial-attached device, if any. An empty device name
    /// refers to the local filesystem.
    pub fn device_name(&self) -> Option<&str> {
        self.device.as_deref().filter(|device| !device.is_empty())
    }

    /// Whether this location refers to a serial-attached device
    pub fn is_device(&self) -> bool {
        self.device_name().is_some()
    }

    pub fn device_str(&self) -> &str {
        self.device.as_deref().unwrap_or_default()
    }

    pub fn path_str(&self) -> &str {
        self.path.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.device, &self.path) {
            (Some(device), Some(path)) => write!(f, "{}:{}", device, path),
            (Some(device), None) => write!(f, "{}:", device),
            (None, Some(path)) => write!(f, "{}", path),
            (None, None) => write!(f, "<empty>"),
        }
    }
}

impl From<&str> for LocationArg {
    fn from(raw: &str) -> Self {
        LocationArg::Raw(raw.to_string())
    }
}

impl From<String> for LocationArg {
    fn from(raw: String) -> Self {
        LocationArg::Raw(raw)
    }
}

impl From<&String> for LocationArg {
    fn from(raw: &String) -> Self {
        LocationArg::Raw(raw.clone())
    }
}

impl From<Location> for LocationArg {
    fn from(location: Location) -> Self {
        LocationArg::Resolved(location)
    }
}

/// Resolve a raw `[device:]path` string into a [`Location`].
///
/// `"a:b"` becomes `{device: a, path: b}`. A string without a `:` (or with
/// nothing after it) fills only `default`.
pub fn resolve(arg: impl Into<LocationArg>, default: DefaultField) -> Location {
    let raw = match arg.into() {
        LocationArg::Resolved(location) => return location,
        LocationArg::Raw(raw) => raw,
    };

    match raw.split_once(':') {
        Some((device, path)) if !path.is_empty() => Location::on_device(device, path),
        Some((first, _)) => bare(first, default),
        None => bare(&raw, default),
    }
}

fn bare(value: &str, default: DefaultField) -> Location {
    match default {
        DefaultField::Path => Location::local(value),
        DefaultField::Device => Location::device(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_device_and_path() {
        assert_eq!(
            resolve("a:b", DefaultField::Path),
            Location::on_device("a", "b")
        );
    }

    #[test]
    fn test_bare_string_defaults() {
        assert_eq!(resolve("a", DefaultField::Path), Location::local("a"));
        assert_eq!(resolve("a", DefaultField::Device), Location::device("a"));
    }

    #[test]
    fn test_resolved_input_unchanged() {
        let location = Location {
            device: Some("/dev/ttyX".to_string()),
            path: None,
        };
        assert_eq!(resolve(location.clone(), DefaultField::Path), location);
    }

    #[test]
    fn test_only_first_colon_splits() {
        let location = resolve("/dev/ttyUSB0:/flash/a:b.txt", DefaultField::Path);
        assert_eq!(location.device_str(), "/dev/ttyUSB0");
        assert_eq!(location.path_str(), "/flash/a:b.txt");
    }

    #[test]
    fn test_empty_device_is_kept() {
        let location = resolve(":/flash/a.txt", DefaultField::Path);
        assert_eq!(location.device, Some(String::new()));
        assert_eq!(location.path_str(), "/flash/a.txt");
        assert_eq!(location.device_name(), None);
        assert!(!location.is_device());
    }

    #[test]
    fn test_device_name() {
        assert_eq!(Location::device("COM3").device_name(), Some("COM3"));
        assert_eq!(Location::local("a.txt").device_name(), None);
    }

    #[test]
    fn test_trailing_colon_uses_default() {
        assert_eq!(
            resolve("/dev/ttyX:", DefaultField::Device),
            Location::device("/dev/ttyX")
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Location::on_device("COM3", "/flash").to_string(), "COM3:/flash");
        assert_eq!(Location::local("a.txt").to_string(), "a.txt");
    }

    proptest! {
        #[test]
        fn prop_colon_free_strings_fill_default(raw in "[^:]*") {
            prop_assert_eq!(resolve(raw.as_str(), DefaultField::Path), Location::local(raw.clone()));
            prop_assert_eq!(resolve(raw.as_str(), DefaultField::Device), Location::device(raw));
        }

        #[test]
        fn prop_split_round_trips(device in "[^:]*", path in ".+") {
            let raw = format!("{}:{}", device, path);
            let location = resolve(raw, DefaultField::Path);
            prop_assert_eq!(location.device, Some(device));
            prop_assert_eq!(location.path, Some(path));
        }
    }
}
