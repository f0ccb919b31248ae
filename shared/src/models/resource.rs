//! Resource label data model.
//!
//! Resource labels are one-shot or session-scoped device/app facts
//! (`device.model = Pixel 8`), distinct from time-series metrics. Formatters
//! map each scalar measurement onto a fixed canonical dotted key.

use serde::{Deserialize, Serialize};

/// Canonical key for the installation-scoped device identifier.
pub const DEVICE_ID: &str = "device.id";
/// Canonical key for the mobile carrier name.
pub const DEVICE_CARRIER: &str = "device.carrier";
/// Canonical key for the device locale.
pub const DEVICE_LOCALE: &str = "device.locale";
/// Canonical key for the device model string.
pub const DEVICE_MODEL: &str = "device.model";
/// Canonical key for the rooted-device flag.
pub const DEVICE_ROOTED: &str = "device.rooted";
/// Canonical key for the operating system version.
pub const OS_VERSION: &str = "os.version";
/// Canonical key for the active network transport.
pub const NETWORK_TYPE: &str = "network.type";

/// A single named device/app fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLabel {
    /// Dotted canonical key, e.g. `device.id`.
    pub name: String,
    /// The fact's value, always a string.
    pub value: String,
}

impl ResourceLabel {
    /// Creates a new resource label.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for ResourceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}
