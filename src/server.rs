//! Liveness endpoint
//!
//! Hosting platforms probe `GET /` to decide whether the process is alive.

use axum::{routing::get, Router};
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Body returned by the liveness route
pub const LIVENESS_BODY: &str = "Bot is running!";

pub fn router() -> Router {
    Router::new().route("/", get(liveness))
}

async fn liveness() -> &'static str {
    LIVENESS_BODY
}

/// Bind the liveness listener on all interfaces
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    TcpListener::bind(addr).await
}

/// Serve until `shutdown` is cancelled
pub async fn serve(listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Liveness server listening");
    }

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}
