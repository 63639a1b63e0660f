//! # printbridge - Bluetooth Printer Bridge
//!
//! printbridge lets a host application drive a Bluetooth thermal printer
//! through discrete method calls. It provides:
//!
//! - **Device listing**: devices already paired with the local adapter
//! - **Connection management**: one RFCOMM link at a time, serialized
//! - **Raw printing**: byte buffers forwarded to the printer unchanged
//!   (after a leading newline)
//! - **Method channel**: the same operations as JSON calls, in-process or
//!   over HTTP
//!
//! There is no printer protocol here: callers send ready-made command bytes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use printbridge::config::BridgeConfig;
//!
//! let manager = BridgeConfig::default().build_manager();
//!
//! for device in manager.list_paired_devices()? {
//!     println!("{}", device);
//! }
//!
//! manager.connect("00:11:62:AA:BB:CC")?;
//! assert!(manager.write(b"Hello\n"));
//! manager.disconnect()?;
//!
//! # Ok::<(), printbridge::BridgeError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`manager`] | The single-connection manager |
//! | [`channel`] | Method-call dispatch |
//! | [`server`] | HTTP surface for the channel |
//! | [`transport`] | RFCOMM socket and TTY links |
//! | [`adapter`] | Paired-device enumeration |
//! | [`permission`] | Permission checks |
//! | [`config`] | Wiring and defaults |
//! | [`error`] | Error types |

pub mod adapter;
pub mod channel;
pub mod config;
pub mod device;
pub mod error;
pub mod manager;
pub mod permission;
pub mod platform;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use channel::{Bridge, MethodCall, MethodResponse};
pub use device::Device;
pub use error::BridgeError;
pub use manager::ConnectionManager;
