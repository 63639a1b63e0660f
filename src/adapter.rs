//! # Bluetooth Adapter Port
//!
//! Answers two questions for the connection manager: is there an adapter at
//! all, and which devices are bonded with it.
//!
//! [`BluezAdapter`] asks `bluetoothd` over D-Bus through `bluer`: the default
//! adapter's known devices, filtered to the paired ones. A device that never
//! sent a name has no `Name` property and is reported with no name.

use std::future::Future;
use std::thread;

use bluer::{Address, ErrorKind, Session};
use tracing::debug;

use crate::device::Device;
use crate::error::BridgeError;

/// Platform adapter seen by the connection manager.
pub trait Adapter: Send + Sync {
    /// Whether a Bluetooth controller exists on this host.
    fn is_present(&self) -> bool;

    /// Devices bonded with the controller.
    fn bonded_devices(&self) -> Result<Vec<Device>, BridgeError>;
}

/// BlueZ adapter backed by the `bluetoothd` D-Bus API.
#[derive(Debug, Clone, Copy, Default)]
pub struct BluezAdapter;

impl BluezAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Adapter for BluezAdapter {
    /// Only a definite "no adapter" from BlueZ counts as absent; any other
    /// failure is left for [`Adapter::bonded_devices`] to report.
    fn is_present(&self) -> bool {
        match run(async { default_adapter().await.map(|_| ()) }) {
            Ok(()) => true,
            Err(BridgeError::BluetoothUnavailable) => false,
            Err(e) => {
                debug!("adapter presence unknown: {}", e);
                true
            }
        }
    }

    fn bonded_devices(&self) -> Result<Vec<Device>, BridgeError> {
        run(async {
            let adapter = default_adapter().await?;
            debug!(adapter = adapter.name(), "listing paired devices");

            let mut addresses = adapter.device_addresses().await.map_err(bluez_error)?;
            addresses.sort();

            let mut devices = Vec::new();
            for address in addresses {
                let device = adapter.device(address).map_err(bluez_error)?;
                if !device.is_paired().await.map_err(bluez_error)? {
                    continue;
                }
                let name = device.name().await.map_err(bluez_error)?;
                devices.push(paired_device(address, name));
            }
            Ok(devices)
        })
    }
}

/// Drive a BlueZ query on its own thread and runtime.
///
/// The manager is synchronous and may be called from inside another
/// runtime, where blocking on a nested one would panic.
fn run<T, F>(query: F) -> Result<T, BridgeError>
where
    T: Send,
    F: Future<Output = Result<T, BridgeError>> + Send,
{
    thread::scope(|scope| {
        scope
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(query)
            })
            .join()
            .unwrap_or_else(|_| Err(BridgeError::Bluetooth("BlueZ query panicked".to_string())))
    })
}

async fn default_adapter() -> Result<bluer::Adapter, BridgeError> {
    let session = Session::new().await.map_err(bluez_error)?;
    session.default_adapter().await.map_err(adapter_error)
}

/// `NotFound` from `default_adapter` means the host has no controller.
fn adapter_error(err: bluer::Error) -> BridgeError {
    match err.kind {
        ErrorKind::NotFound => BridgeError::BluetoothUnavailable,
        _ => bluez_error(err),
    }
}

fn bluez_error(err: bluer::Error) -> BridgeError {
    BridgeError::Bluetooth(err.to_string())
}

/// A blank name counts as no name.
fn paired_device(address: Address, name: Option<String>) -> Device {
    let name = name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    Device::new(name, address.to_string())
}
