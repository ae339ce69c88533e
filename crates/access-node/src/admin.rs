//! Admin HTTP endpoint: `/health` and `/metrics`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use bq_02_identity_store::{AuditSpool, IdentityStore};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

/// State shared across admin handlers
#[derive(Clone)]
pub struct AdminState {
    pub store: Arc<dyn IdentityStore>,
    pub spool: Arc<dyn AuditSpool>,
    pub unit_code: String,
}

/// Build Admin router
pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serves the admin router until shutdown.
pub async fn serve_admin(
    addr: SocketAddr,
    state: AdminState,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Starting Admin server");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow_and_update() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
}

/// 200 when the identity store answers, 503 otherwise.
async fn health_check(State(state): State<AdminState>) -> impl IntoResponse {
    let spool_depth = state.spool.depth().ok();
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "service": "bq-access",
                "version": env!("CARGO_PKG_VERSION"),
                "unit": state.unit_code,
                "store": state.store.backend(),
                "spool_depth": spool_depth,
            })),
        ),
        Err(e) => {
            warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "service": "bq-access",
                    "unit": state.unit_code,
                    "store": state.store.backend(),
                    "error": e.to_string(),
                    "spool_depth": spool_depth,
                })),
            )
        }
    }
}

/// Prometheus text exposition.
async fn metrics() -> impl IntoResponse {
    match bq_telemetry::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            e.to_string(),
        ),
    }
}
