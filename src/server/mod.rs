//! # HTTP Method Channel
//!
//! Exposes the bridge's method calls over HTTP so a host application in any
//! language can drive the printer.
//!
//! ## Usage
//!
//! ```bash
//! printbridge serve --listen 127.0.0.1:8090
//!
//! curl -s localhost:8090/api/channel \
//!     -d '{"method": "CONNECT_BLUETOOTH", "arguments": {"address": "00:11:62:AA:BB:CC"}}' \
//!     -H 'content-type: application/json'
//! curl -s localhost:8090/api/channel/PRINT \
//!     -d '{"bytes": [72, 105, 10]}' -H 'content-type: application/json'
//! ```
//!
//! Method errors are reported in the response body with HTTP 200; only a
//! malformed request body produces an HTTP error status.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::channel::Bridge;
use crate::error::BridgeError;

/// Build the router for `bridge`.
pub fn router(bridge: Bridge) -> Router {
    let app_state = Arc::new(AppState::new(bridge));

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/channel", post(handlers::call))
        .route("/api/channel/:method", post(handlers::call_named))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Serve the method channel until Ctrl-C, then disconnect the printer.
///
/// ## Example
///
/// ```no_run
/// use std::sync::Arc;
/// use printbridge::{channel::Bridge, config::BridgeConfig, server};
///
/// # async fn example() -> Result<(), printbridge::BridgeError> {
/// let config = BridgeConfig::default();
/// let bridge = Bridge::new(Arc::new(config.build_manager()));
/// server::serve(&config.listen_addr, bridge).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(listen_addr: &str, bridge: Bridge) -> Result<(), BridgeError> {
    let app = router(bridge.clone());

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .map_err(|e| BridgeError::Server(format!("Failed to bind to {}: {}", listen_addr, e)))?;

    info!(listen_addr, "printbridge method channel listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BridgeError::Server(e.to_string()))?;

    info!("shutting down, closing printer connection");
    bridge.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
