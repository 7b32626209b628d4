//! Health Endpoint
//!
//! Minimal liveness surface for the process: `GET /health` answers 200 while
//! the ingester runs. Served on the configured application port and shut
//! down together with the pipeline.

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::io;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Bind the health listener. A bind failure is fatal at startup.
pub async fn bind(app_port: u16) -> io::Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", app_port)).await
}

/// Serve the health route until cancellation.
pub async fn serve(listener: TcpListener, cancel: CancellationToken) {
    let router = Router::new().route("/health", get(|| async { StatusCode::OK }));

    let shutdown = async move { cancel.cancelled().await };
    if let Err(serve_error) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!(error = %serve_error, "Health server stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== bind tests ====================

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = bind(0).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    // ==================== serve tests ====================

    #[tokio::test]
    async fn test_serve_stops_on_cancellation() {
        let listener = bind(0).await.unwrap();
        let cancel = CancellationToken::new();

        let server = tokio::spawn(serve(listener, cancel.clone()));
        cancel.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(1), server)
            .await
            .expect("server should stop promptly")
            .unwrap();
    }
}
