//! # Bridge Configuration
//!
//! Selects how the connection manager reaches the printer and which
//! permission rules it enforces.
//!
//! ## Usage
//!
//! ```
//! use printbridge::config::{BridgeConfig, LinkMode};
//!
//! let config = BridgeConfig {
//!     link: LinkMode::Tty,
//!     ..BridgeConfig::default()
//! };
//! let manager = config.build_manager();
//! assert!(!manager.is_connected());
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::adapter::BluezAdapter;
use crate::manager::ConnectionManager;
use crate::permission::{GrantAll, Permission, PermissionGate, PermissionModel, StaticGate};
use crate::transport::{Connector, RFCOMM_DEFAULT_CHANNEL, RfcommConnector, TtyConnector};

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8090";

/// How a connect reaches the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// Raw RFCOMM socket (no binding needed)
    #[default]
    Socket,
    /// `/dev/rfcommN` device already bound with `rfcomm bind`
    Tty,
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket => f.write_str("socket"),
            Self::Tty => f.write_str("tty"),
        }
    }
}

impl FromStr for LinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "socket" => Ok(Self::Socket),
            "tty" => Ok(Self::Tty),
            other => Err(format!("unknown link mode '{}' (expected socket or tty)", other)),
        }
    }
}

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the HTTP surface listens on (e.g., "127.0.0.1:8090")
    pub listen_addr: String,
    /// Socket or bound TTY
    pub link: LinkMode,
    /// RFCOMM channel for socket links
    pub channel: u8,
    /// Permission set to enforce
    pub permission_model: PermissionModel,
    /// Fixed grant set; `None` grants everything
    pub granted: Option<Vec<Permission>>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            link: LinkMode::default(),
            channel: RFCOMM_DEFAULT_CHANNEL,
            permission_model: PermissionModel::default(),
            granted: None,
        }
    }
}

impl BridgeConfig {
    fn connector(&self) -> Arc<dyn Connector> {
        match self.link {
            LinkMode::Socket => Arc::new(RfcommConnector::new(self.channel)),
            LinkMode::Tty => Arc::new(TtyConnector::new()),
        }
    }

    fn gate(&self) -> Arc<dyn PermissionGate> {
        match &self.granted {
            Some(granted) => Arc::new(StaticGate::new(granted.iter().copied())),
            None => Arc::new(GrantAll),
        }
    }

    /// Wire a manager against the local BlueZ stack.
    pub fn build_manager(&self) -> ConnectionManager {
        ConnectionManager::new(Arc::new(BluezAdapter::new()), self.connector(), self.gate())
            .with_permission_model(self.permission_model)
    }
}
