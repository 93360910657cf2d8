//! HTTP listener
//!
//! Serves the WebSocket endpoint plus two plain HTTP probes.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::handler::ws_upgrade;
use crate::coordinator::CoordinatorHandle;

/// Routes served by the coordinator:
///
/// - `GET /ws` upgrades to the event socket
/// - `GET /health` answers `ok` while the process is up
/// - `GET /status` returns a JSON snapshot of the rotation
pub fn router(coordinator: CoordinatorHandle) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(coordinator)
}

async fn health() -> &'static str {
    "ok"
}

async fn status(State(coordinator): State<CoordinatorHandle>) -> impl IntoResponse {
    match coordinator.snapshot().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

/// WebSocket server bound to one coordinator
pub struct WsServer {
    /// Handle to the coordinator task
    coordinator: CoordinatorHandle,
    /// Cancellation token for graceful shutdown
    cancel: CancellationToken,
}

impl WsServer {
    /// Create a new server
    pub fn new(coordinator: CoordinatorHandle, cancel: CancellationToken) -> Self {
        Self {
            coordinator,
            cancel,
        }
    }

    /// Bind `bind_addr` and serve until cancelled
    pub async fn run(&self, bind_addr: &str) -> Result<()> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!("WebSocket server listening on {}", local_addr);

        let cancel = self.cancel.clone();
        axum::serve(listener, router(self.coordinator.clone()))
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("WebSocket server shutting down");
            })
            .await
            .context("WebSocket server failed")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::coordinator::Coordinator;
    use crate::gateway::Gateways;
    use onair_core::config::CoordinatorConfig;

    fn spawn_coordinator() -> (CoordinatorHandle, CancellationToken) {
        let cancel = CancellationToken::new();
        let (handle, _task) =
            Coordinator::spawn(CoordinatorConfig::default(), Gateways::default(), cancel.clone());
        (handle, cancel)
    }

    #[tokio::test]
    async fn test_health() {
        let (handle, cancel) = spawn_coordinator();
        let response = router(handle)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"ok");
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_status_reports_snapshot() {
        let (handle, cancel) = spawn_coordinator();
        let response = router(handle)
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["online"], 0);
        assert_eq!(json["vote_position"], 50.0);
        assert!(json["broadcaster"].is_null());
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_status_when_coordinator_stopped() {
        let cancel = CancellationToken::new();
        let (handle, task) =
            Coordinator::spawn(CoordinatorConfig::default(), Gateways::default(), cancel.clone());
        cancel.cancel();
        task.await.unwrap();

        let response = router(handle)
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_ws_requires_upgrade() {
        let (handle, cancel) = spawn_coordinator();
        let response = router(handle)
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        cancel.cancel();
    }
}
