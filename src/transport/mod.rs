//! # Printer Transport Layer
//!
//! This module provides the links the connection manager writes through.
//!
//! A [`Link`] pairs an open socket with its output stream; a [`Connector`]
//! opens one for a Bluetooth address. The manager only ever sees these two
//! traits, so tests can swap in in-memory links.
//!
//! ## Available Transports
//!
//! - [`rfcomm`]: raw `AF_BLUETOOTH` RFCOMM socket (Linux)
//! - [`tty`]: an `/dev/rfcommN` device already bound to the printer

use std::io;

use uuid::Uuid;

pub mod rfcomm;
pub mod tty;

pub use rfcomm::{RfcommConnector, is_valid_mac};
pub use tty::TtyConnector;

/// Serial Port Profile service class (`00001101-0000-1000-8000-00805F9B34FB`).
pub const SPP_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// RFCOMM channel SPP printers listen on.
pub const RFCOMM_DEFAULT_CHANNEL: u8 = 1;

/// An open connection: socket plus its write-only output stream.
pub trait Link: Send {
    /// Write the whole buffer, blocking until the transport accepts it.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Close the output stream. Called before [`Link::close_socket`].
    fn close_stream(&mut self) -> io::Result<()>;

    /// Close the underlying socket.
    fn close_socket(&mut self) -> io::Result<()>;
}

/// Opens [`Link`]s to a Bluetooth address.
pub trait Connector: Send + Sync {
    /// Open a link to `address`, blocking until the handshake completes.
    fn open(&self, address: &str) -> io::Result<Box<dyn Link>>;
}
