//! # Error Types
//!
//! This module defines the error type used throughout the bridge, and the
//! stable wire codes each variant is reported under on the method channel.

use thiserror::Error;

/// Main error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A required Bluetooth permission is missing (a prompt was requested)
    #[error("Bluetooth permission is required")]
    PermissionDenied,

    /// No Bluetooth adapter on this host
    #[error("Bluetooth is not available on this device")]
    BluetoothUnavailable,

    /// Adapter-level failure while enumerating devices
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),

    /// Connect was called without an address
    #[error("Bluetooth address is required")]
    InvalidAddress,

    /// Print was called without a usable byte list
    #[error("Bytes to print is required: {0}")]
    InvalidBytes(String),

    /// Transport failure while opening the RFCOMM link
    #[error("Connection error: {0}")]
    Connection(String),

    /// Closing the stream or socket failed (state is cleared regardless)
    #[error("Disconnect error: {0}")]
    Disconnect(String),

    /// Write or probe failed on an open link
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP surface failures (bind, serve)
    #[error("Server error: {0}")]
    Server(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Code reported in `error` responses on the method channel.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::BluetoothUnavailable => "BLUETOOTH_NOT_AVAILABLE",
            Self::Bluetooth(_) => "BLUETOOTH_ERROR",
            Self::InvalidAddress => "INVALID_ADDRESS",
            Self::InvalidBytes(_) => "INVALID_BYTES",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::Disconnect(_) => "DISCONNECT_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Server(_) => "SERVER_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}
