//! In-memory adapter, connector and link for driving the manager without
//! Bluetooth hardware.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use printbridge::ConnectionManager;
use printbridge::Device;
use printbridge::adapter::Adapter;
use printbridge::error::BridgeError;
use printbridge::permission::{Permission, PermissionGate, StaticGate};
use printbridge::transport::{Connector, Link};

/// Address the fake connector accepts.
pub const PRINTER: &str = "00:11:62:AA:BB:CC";

/// Second reachable printer for reconnect tests.
pub const OTHER_PRINTER: &str = "12:34:56:78:9A:BC";

/// Adapter with a fixed device list that counts every call.
pub struct FakeAdapter {
    pub present: bool,
    pub devices: Vec<Device>,
    pub calls: AtomicUsize,
}

impl FakeAdapter {
    pub fn new(present: bool) -> Self {
        Self {
            present,
            devices: vec![
                Device::new(Some("TSP650II".into()), PRINTER),
                Device::new(None, OTHER_PRINTER),
            ],
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Adapter for FakeAdapter {
    fn is_present(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.present
    }

    fn bonded_devices(&self) -> Result<Vec<Device>, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.devices.clone())
    }
}

/// What reached the "printer", shared by every link the connector opens.
#[derive(Default)]
pub struct Wire {
    data: Mutex<Vec<u8>>,
    broken: AtomicBool,
    fail_close: AtomicBool,
    pub stream_closes: AtomicUsize,
    pub socket_closes: AtomicUsize,
}

impl Wire {
    pub fn bytes(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.data.lock().unwrap().clear();
    }

    /// Make every following write fail with a broken pipe.
    pub fn break_pipe(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    /// Make every following close call fail.
    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn stream_closes(&self) -> usize {
        self.stream_closes.load(Ordering::SeqCst)
    }

    pub fn socket_closes(&self) -> usize {
        self.socket_closes.load(Ordering::SeqCst)
    }
}

pub struct FakeLink {
    wire: Arc<Wire>,
}

impl Link for FakeLink {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if self.wire.broken.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.wire.data.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn close_stream(&mut self) -> io::Result<()> {
        self.wire.stream_closes.fetch_add(1, Ordering::SeqCst);
        if self.wire.fail_close.load(Ordering::SeqCst) {
            return Err(io::Error::other("stream close failed"));
        }
        Ok(())
    }

    fn close_socket(&mut self) -> io::Result<()> {
        self.wire.socket_closes.fetch_add(1, Ordering::SeqCst);
        if self.wire.fail_close.load(Ordering::SeqCst) {
            return Err(io::Error::other("socket close failed"));
        }
        Ok(())
    }
}

/// Connector that reaches only [`PRINTER`] and [`OTHER_PRINTER`].
pub struct FakeConnector {
    pub wire: Arc<Wire>,
    pub opened: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            wire: Arc::new(Wire::default()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Connector for FakeConnector {
    fn open(&self, address: &str) -> io::Result<Box<dyn Link>> {
        self.opened.lock().unwrap().push(address.to_string());
        if address != PRINTER && address != OTHER_PRINTER {
            return Err(io::Error::new(
                io::ErrorKind::HostUnreachable,
                "Host is down (os error 112)",
            ));
        }
        Ok(Box::new(FakeLink {
            wire: Arc::clone(&self.wire),
        }))
    }
}

/// A manager wired to fakes, with handles to inspect them.
pub struct Rig {
    pub manager: Arc<ConnectionManager>,
    pub adapter: Arc<FakeAdapter>,
    pub connector: Arc<FakeConnector>,
    pub gate: Arc<StaticGate>,
}

impl Rig {
    /// Adapter present, modern permissions granted.
    pub fn new() -> Self {
        Self::build(
            true,
            StaticGate::new([Permission::BluetoothConnect, Permission::BluetoothScan]),
        )
    }

    pub fn with_gate(gate: StaticGate) -> Self {
        Self::build(true, gate)
    }

    pub fn without_adapter() -> Self {
        Self::build(
            false,
            StaticGate::new([Permission::BluetoothConnect, Permission::BluetoothScan]),
        )
    }

    fn build(present: bool, gate: StaticGate) -> Self {
        let adapter = Arc::new(FakeAdapter::new(present));
        let connector = Arc::new(FakeConnector::new());
        let gate = Arc::new(gate);
        let manager = ConnectionManager::new(
            Arc::clone(&adapter) as Arc<dyn Adapter>,
            Arc::clone(&connector) as Arc<dyn Connector>,
            Arc::clone(&gate) as Arc<dyn PermissionGate>,
        );
        Self {
            manager: Arc::new(manager),
            adapter,
            connector,
            gate,
        }
    }

    pub fn wire(&self) -> &Wire {
        &self.connector.wire
    }
}
