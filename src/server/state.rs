//! Server state.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::channel::Bridge;

/// Application state shared across handlers.
pub struct AppState {
    pub bridge: Bridge,
    /// Unix timestamp of server boot.
    pub boot_time: u64,
}

impl AppState {
    pub fn new(bridge: Bridge) -> Self {
        let boot_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self { bridge, boot_time }
    }
}
