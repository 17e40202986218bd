//! Report API Service Library
//!
//! HTTP front end of the biomass extraction pipeline: accepts an uploaded
//! area of interest and returns the assembled report as JSON.

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::state::AppState;

/// Build the service router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        // Reports
        .route(
            "/generate-report",
            post(handlers::report::generate_report_handler),
        )
        .route(
            "/biomass-series",
            post(handlers::report::biomass_series_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
