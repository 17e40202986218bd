//! Health, readiness and metrics handlers.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub database: String,
}

/// GET /health - Basic health check
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /ready - Readiness check (verifies reference store connectivity)
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let (status, database) = match state.pipeline.resolver().store().ping().await {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Reference store not ready");
            (StatusCode::SERVICE_UNAVAILABLE, format!("error: {}", e))
        }
    };

    let body = ReadyResponse {
        ready: status == StatusCode::OK,
        database,
    };
    (status, Json(body)).into_response()
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}
