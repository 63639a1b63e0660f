//! Paired device descriptors.

use std::fmt;

/// Name shown for devices that never reported one.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";

/// A bonded Bluetooth device as reported by the adapter.
///
/// Rendered on the method channel as `"<name>#<address>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Friendly name, if the device ever advertised one
    pub name: Option<String>,
    /// Hardware address (`XX:XX:XX:XX:XX:XX`)
    pub address: String,
}

impl Device {
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name,
            address: address.into(),
        }
    }

    /// Name with the "Unknown Device" fallback applied.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_DEVICE_NAME)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.display_name(), self.address)
    }
}
