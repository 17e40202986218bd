//! Report endpoints.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use ecohub_common::EcohubError;
use extraction::ExtractionResult;

use super::upload::Upload;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /generate-report - snapshot report with a clipped GeoTIFF
pub async fn generate_report_handler(
    Extension(state): Extension<Arc<AppState>>,
    upload: Upload,
) -> Result<Json<ExtractionResult>, ApiError> {
    let dataset = upload.into_dataset().await?;
    let report = state.pipeline.generate_report(&dataset).await?;

    let dir = state.artifact_dir.clone();
    let result = tokio::task::spawn_blocking(move || report.persist(&dir))
        .await
        .map_err(|e| EcohubError::Internal(format!("Persist task failed: {}", e)))??;

    Ok(Json(result))
}

/// POST /biomass-series - annual biomass means over the AOI
pub async fn biomass_series_handler(
    Extension(state): Extension<Arc<AppState>>,
    upload: Upload,
) -> Result<Json<ExtractionResult>, ApiError> {
    let dataset = upload.into_dataset().await?;
    let result = state.pipeline.biomass_series(&dataset).await?;
    Ok(Json(result))
}
