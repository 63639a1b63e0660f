//! # Permission Port
//!
//! The connection manager checks Bluetooth permissions through a
//! [`PermissionGate`] before touching the adapter. The host environment
//! supplies the real gate (and whatever prompt it shows); a missing grant
//! fails the current call with [`BridgeError::PermissionDenied`] after a
//! prompt has been requested, and the caller retries once the user answers.
//!
//! ## Permission Models
//!
//! | Model | Required |
//! |-------|----------|
//! | Modern | `BLUETOOTH_CONNECT`, `BLUETOOTH_SCAN` |
//! | Legacy | `BLUETOOTH` |

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::BridgeError;

/// A Bluetooth capability the host may grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Bluetooth,
    BluetoothConnect,
    BluetoothScan,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bluetooth => "BLUETOOTH",
            Self::BluetoothConnect => "BLUETOOTH_CONNECT",
            Self::BluetoothScan => "BLUETOOTH_SCAN",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BLUETOOTH" => Ok(Self::Bluetooth),
            "BLUETOOTH_CONNECT" => Ok(Self::BluetoothConnect),
            "BLUETOOTH_SCAN" => Ok(Self::BluetoothScan),
            other => Err(format!("unknown permission '{}'", other)),
        }
    }
}

/// Which permission set the host platform enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionModel {
    /// Split connect/scan permissions
    #[default]
    Modern,
    /// Single coarse Bluetooth permission
    Legacy,
}

impl PermissionModel {
    /// Permissions that must all be granted before any Bluetooth operation.
    pub fn required(&self) -> &'static [Permission] {
        match self {
            Self::Modern => &[Permission::BluetoothConnect, Permission::BluetoothScan],
            Self::Legacy => &[Permission::Bluetooth],
        }
    }
}

/// Capability-check port supplied by the host.
pub trait PermissionGate: Send + Sync {
    /// Whether `permission` is currently granted.
    fn is_granted(&self, permission: Permission) -> bool;

    /// Ask the host to prompt for `permissions`. Does not wait for the answer.
    fn request(&self, permissions: &[Permission]);
}

/// Check the permissions `model` requires, requesting them if any is missing.
pub fn ensure(gate: &dyn PermissionGate, model: PermissionModel) -> Result<(), BridgeError> {
    let required = model.required();
    let missing: Vec<Permission> = required
        .iter()
        .copied()
        .filter(|p| !gate.is_granted(*p))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    info!(?missing, "Bluetooth permission missing, requesting");
    gate.request(required);
    Err(BridgeError::PermissionDenied)
}

/// Gate that grants everything.
///
/// On Linux, BlueZ enforces access when the socket is opened, so this is the
/// default there.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrantAll;

impl PermissionGate for GrantAll {
    fn is_granted(&self, _permission: Permission) -> bool {
        true
    }

    fn request(&self, _permissions: &[Permission]) {}
}

/// Gate with a fixed grant set that records every prompt request.
#[derive(Debug, Default)]
pub struct StaticGate {
    granted: HashSet<Permission>,
    requests: Mutex<Vec<Vec<Permission>>>,
}

impl StaticGate {
    pub fn new(granted: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Gate that grants nothing.
    pub fn deny_all() -> Self {
        Self::new([])
    }

    /// Prompts requested so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<Permission>> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PermissionGate for StaticGate {
    fn is_granted(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    fn request(&self, permissions: &[Permission]) {
        debug!(?permissions, "recording permission prompt");
        let mut requests = match self.requests.lock() {
            Ok(requests) => requests,
            Err(poisoned) => poisoned.into_inner(),
        };
        requests.push(permissions.to_vec());
    }
}
