//! # Method-Call Channel
//!
//! The request/response surface the host application drives the printer
//! through. A call names a method and carries a JSON arguments object; the
//! answer is a success value, a coded error, or "not implemented".
//!
//! | Method | Arguments | Result | Error codes |
//! |--------|-----------|--------|-------------|
//! | `GET_PAIRED_DEVICES` | | `["name#address", ...]` | `PERMISSION_DENIED`, `BLUETOOTH_NOT_AVAILABLE`, `BLUETOOTH_ERROR` |
//! | `CONNECT_BLUETOOTH` | `address` | `true` | `INVALID_ADDRESS`, `PERMISSION_DENIED`, `BLUETOOTH_NOT_AVAILABLE`, `CONNECTION_ERROR` |
//! | `CONNECTION_STATUS` | | bool | |
//! | `PRINT` | `bytes` (0-255) | bool | `INVALID_BYTES` |
//! | `DISCONNECT_BLUETOOTH` | | `true` | `DISCONNECT_ERROR` |
//! | `GET_PLATFORM_VERSION` | | `"Linux <release>"` | |
//!
//! Every call except the version query runs on the blocking pool, so the
//! caller's task is never stuck behind Bluetooth I/O.
//!
//! ## Wire Format
//!
//! ```json
//! {"method": "PRINT", "arguments": {"bytes": [27, 64, 72, 105]}}
//! {"status": "success", "result": true}
//! {"status": "error", "code": "INVALID_ADDRESS", "message": "Bluetooth address is required", "details": null}
//! {"status": "not_implemented"}
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::manager::ConnectionManager;
use crate::platform::platform_version;

/// Methods understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GetPairedDevices,
    ConnectBluetooth,
    ConnectionStatus,
    Print,
    DisconnectBluetooth,
    GetPlatformVersion,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::GetPairedDevices,
        Method::ConnectBluetooth,
        Method::ConnectionStatus,
        Method::Print,
        Method::DisconnectBluetooth,
        Method::GetPlatformVersion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetPairedDevices => "GET_PAIRED_DEVICES",
            Self::ConnectBluetooth => "CONNECT_BLUETOOTH",
            Self::ConnectionStatus => "CONNECTION_STATUS",
            Self::Print => "PRINT",
            Self::DisconnectBluetooth => "DISCONNECT_BLUETOOTH",
            Self::GetPlatformVersion => "GET_PLATFORM_VERSION",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or(())
    }
}

/// A request from the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// The answer to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success {
        result: Value,
    },
    Error {
        code: String,
        message: Option<String>,
        #[serde(default)]
        details: Value,
    },
    NotImplemented,
}

impl MethodResponse {
    pub fn success(result: impl Into<Value>) -> Self {
        Self::Success {
            result: result.into(),
        }
    }

    fn error(err: &BridgeError, details: Value) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: Some(err.to_string()),
            details,
        }
    }

    /// Error code, if this is an error response.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Error { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Result value, if this is a success response.
    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Success { result } => Some(result),
            _ => None,
        }
    }
}

impl From<Result<Value, BridgeError>> for MethodResponse {
    fn from(result: Result<Value, BridgeError>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(err) => Self::error(&err, Value::Null),
        }
    }
}

/// Dispatches method calls onto a [`ConnectionManager`].
#[derive(Clone)]
pub struct Bridge {
    manager: Arc<ConnectionManager>,
}

impl Bridge {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Handle one call. Never fails: every error becomes a response.
    pub async fn handle(&self, call: MethodCall) -> MethodResponse {
        let Ok(method) = call.method.parse::<Method>() else {
            debug!(method = %call.method, "unknown method");
            return MethodResponse::NotImplemented;
        };
        debug!(%method, "method call");

        match method {
            Method::GetPairedDevices => self
                .run(|m| {
                    m.list_paired_devices().map(|devices| {
                        Value::Array(
                            devices
                                .iter()
                                .map(|d| Value::String(d.to_string()))
                                .collect(),
                        )
                    })
                })
                .await
                .unwrap_or_else(|e| Err(BridgeError::Bluetooth(e.to_string())))
                .into(),

            Method::ConnectBluetooth => {
                let Some(address) = call.arguments.get("address").and_then(Value::as_str) else {
                    return MethodResponse::error(&BridgeError::InvalidAddress, Value::Null);
                };
                let address = address.to_string();
                self.run(move |m| m.connect(&address).map(Value::Bool))
                    .await
                    .unwrap_or_else(|e| Err(BridgeError::Connection(e.to_string())))
                    .into()
            }

            // Any failure here, including a panicked task, reads as "not connected".
            Method::ConnectionStatus => {
                let alive = self.run(|m| m.probe()).await.unwrap_or(false);
                MethodResponse::success(alive)
            }

            Method::Print => {
                let bytes = match parse_bytes(call.arguments.get("bytes")) {
                    Ok(bytes) => bytes,
                    Err(e) => return MethodResponse::error(&e, Value::Bool(false)),
                };
                let printed = self.run(move |m| m.write(&bytes)).await.unwrap_or(false);
                MethodResponse::success(printed)
            }

            Method::DisconnectBluetooth => self
                .run(|m| m.disconnect().map(Value::Bool))
                .await
                .unwrap_or_else(|e| Err(BridgeError::Disconnect(e.to_string())))
                .into(),

            Method::GetPlatformVersion => MethodResponse::success(platform_version()),
        }
    }

    /// Whether the manager holds a connection (no I/O).
    pub async fn is_connected(&self) -> bool {
        self.run(|m| m.is_connected()).await.unwrap_or(false)
    }

    /// Disconnect on teardown. Errors are logged, not returned.
    pub async fn shutdown(&self) {
        match self.run(|m| m.disconnect()).await {
            Ok(Ok(_)) => debug!("bridge shut down"),
            Ok(Err(e)) => warn!("disconnect on shutdown: {}", e),
            Err(e) => warn!("disconnect task failed on shutdown: {}", e),
        }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, JoinError>
    where
        T: Send + 'static,
        F: FnOnce(&ConnectionManager) -> T + Send + 'static,
    {
        let manager = Arc::clone(&self.manager);
        tokio::task::spawn_blocking(move || op(&manager)).await
    }
}

/// Validate the `bytes` argument: a list of integers in 0..=255.
fn parse_bytes(value: Option<&Value>) -> Result<Vec<u8>, BridgeError> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Err(BridgeError::InvalidBytes("expected a list of bytes".to_string()));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| {
                    BridgeError::InvalidBytes(format!("element {} ({}) is not in 0..=255", i, item))
                })
        })
        .collect()
}
