//! # Printer Connection Manager
//!
//! Owns at most one printer connection and serializes every operation on it.
//!
//! ## State
//!
//! ```text
//!                connect (ok)
//!   Disconnected ────────────► Connected ──┐
//!        ▲                        │        │ connect (replaces)
//!        │  disconnect            │        │
//!        │  write/probe failure   ◄────────┘
//!        └────────────────────────┘
//! ```
//!
//! A failed connect always lands in `Disconnected`: the previous link is
//! closed before the new one is opened.
//!
//! ## Serialization
//!
//! All state lives in one `parking_lot::FairMutex`. Unlocking hands the lock
//! to the longest waiter, so overlapping calls from independent tasks run
//! one at a time in arrival order. The operations block on I/O; async
//! callers should go through [`crate::channel::Bridge`], which moves them
//! onto the blocking pool.
//!
//! ## Broken Links
//!
//! Write and probe failures are reported as `false`, never as errors, but
//! they tear the connection down so the next call reports "not connected"
//! instead of retrying a dead pipe. The failure text is logged and kept in
//! [`ConnectionManager::last_failure`].

use std::io;
use std::sync::Arc;

use parking_lot::FairMutex;
use tracing::{debug, info, warn};

use crate::adapter::Adapter;
use crate::device::Device;
use crate::error::BridgeError;
use crate::permission::{self, PermissionGate, PermissionModel};
use crate::transport::{Connector, Link};

/// Byte prepended to every print payload.
const PRINT_PREFIX: u8 = b'\n';

/// Byte written by [`ConnectionManager::probe`].
const PROBE_BYTE: u8 = b' ';

/// The live connection: address plus socket/stream pair.
struct Connection {
    address: String,
    link: Box<dyn Link>,
}

impl Connection {
    /// Close stream then socket. Both are attempted whatever the first did.
    fn close(mut self) -> Result<(), String> {
        let stream = self.link.close_stream();
        let socket = self.link.close_socket();

        let errors: Vec<String> = [("stream", stream), ("socket", socket)]
            .into_iter()
            .filter_map(|(what, result)| result.err().map(|e| format!("{} close failed: {}", what, e)))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}

#[derive(Default)]
struct State {
    connection: Option<Connection>,
    last_failure: Option<String>,
}

impl State {
    /// Drop a connection whose link just failed.
    fn drop_broken(&mut self, operation: &str, err: io::Error) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        warn!(
            address = %connection.address,
            "{} failed, dropping connection: {}",
            operation,
            err
        );
        if let Err(close_err) = connection.close() {
            debug!("closing broken link: {}", close_err);
        }
        self.last_failure = Some(format!("{} failed: {}", operation, err));
    }
}

/// Single-connection printer manager.
pub struct ConnectionManager {
    adapter: Arc<dyn Adapter>,
    connector: Arc<dyn Connector>,
    gate: Arc<dyn PermissionGate>,
    model: PermissionModel,
    state: FairMutex<State>,
}

impl ConnectionManager {
    pub fn new(
        adapter: Arc<dyn Adapter>,
        connector: Arc<dyn Connector>,
        gate: Arc<dyn PermissionGate>,
    ) -> Self {
        Self {
            adapter,
            connector,
            gate,
            model: PermissionModel::default(),
            state: FairMutex::new(State::default()),
        }
    }

    /// Enforce `model` instead of the modern permission set.
    pub fn with_permission_model(mut self, model: PermissionModel) -> Self {
        self.model = model;
        self
    }

    pub fn permission_model(&self) -> PermissionModel {
        self.model
    }

    /// List devices bonded with the adapter.
    ///
    /// The adapter is not consulted at all when permissions are missing.
    pub fn list_paired_devices(&self) -> Result<Vec<Device>, BridgeError> {
        permission::ensure(self.gate.as_ref(), self.model)?;
        if !self.adapter.is_present() {
            return Err(BridgeError::BluetoothUnavailable);
        }

        let devices = self.adapter.bonded_devices()?;
        debug!(count = devices.len(), "listed paired devices");
        Ok(devices)
    }

    /// Replace any existing connection with a new one to `address`.
    ///
    /// Blocks until the RFCOMM handshake completes.
    pub fn connect(&self, address: &str) -> Result<bool, BridgeError> {
        permission::ensure(self.gate.as_ref(), self.model)?;
        if !self.adapter.is_present() {
            return Err(BridgeError::BluetoothUnavailable);
        }

        let mut state = self.state.lock();

        if let Some(previous) = state.connection.take() {
            info!(address = %previous.address, "closing previous connection");
            if let Err(e) = previous.close() {
                debug!("ignoring close failure on previous connection: {}", e);
            }
        }

        match self.connector.open(address) {
            Ok(link) => {
                info!(address, "connected to printer");
                state.connection = Some(Connection {
                    address: address.to_string(),
                    link,
                });
                Ok(true)
            }
            Err(e) => {
                warn!(address, "connect failed: {}", e);
                Err(BridgeError::Connection(e.to_string()))
            }
        }
    }

    /// Send `bytes` to the printer, prefixed with a newline.
    ///
    /// Returns `false` when nothing is connected or the write fails; a
    /// failed write also drops the connection.
    pub fn write(&self, bytes: &[u8]) -> bool {
        let mut state = self.state.lock();
        let Some(connection) = state.connection.as_mut() else {
            debug!("write skipped, not connected");
            return false;
        };

        let mut payload = Vec::with_capacity(bytes.len() + 1);
        payload.push(PRINT_PREFIX);
        payload.extend_from_slice(bytes);

        match connection.link.write_all(&payload) {
            Ok(()) => {
                debug!(bytes = payload.len(), "wrote print payload");
                true
            }
            Err(e) => {
                state.drop_broken("write", e);
                false
            }
        }
    }

    /// Check the link is still alive by writing a single space.
    ///
    /// Returns `false` without side effects when nothing is connected.
    pub fn probe(&self) -> bool {
        let mut state = self.state.lock();
        let Some(connection) = state.connection.as_mut() else {
            return false;
        };

        match connection.link.write_all(&[PROBE_BYTE]) {
            Ok(()) => true,
            Err(e) => {
                state.drop_broken("probe", e);
                false
            }
        }
    }

    /// Close the connection, if any.
    ///
    /// The state is cleared even when a close call fails; the failure is
    /// still returned as [`BridgeError::Disconnect`].
    pub fn disconnect(&self) -> Result<bool, BridgeError> {
        let mut state = self.state.lock();
        let Some(connection) = state.connection.take() else {
            return Ok(true);
        };

        let address = connection.address.clone();
        connection.close().map_err(|e| {
            warn!(address = %address, "disconnect: {}", e);
            BridgeError::Disconnect(e)
        })?;

        info!(address = %address, "disconnected from printer");
        Ok(true)
    }

    /// Whether a connection is held. No I/O.
    pub fn is_connected(&self) -> bool {
        self.state.lock().connection.is_some()
    }

    /// Address of the held connection.
    pub fn connected_address(&self) -> Option<String> {
        self.state
            .lock()
            .connection
            .as_ref()
            .map(|c| c.address.clone())
    }

    /// Most recent write/probe failure, e.g. `"write failed: Broken pipe (os error 32)"`.
    pub fn last_failure(&self) -> Option<String> {
        self.state.lock().last_failure.clone()
    }
}
