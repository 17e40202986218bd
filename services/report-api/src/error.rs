//! Mapping of pipeline errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ecohub_common::EcohubError;
use serde::Serialize;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

/// Handler error; wraps [`EcohubError`] so `?` works in handlers.
#[derive(Debug)]
pub struct ApiError(pub EcohubError);

impl From<EcohubError> for ApiError {
    fn from(err: EcohubError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if err.is_user_visible_outcome() {
            tracing::info!(code = err.code(), "{}", err);
        } else if matches!(err, EcohubError::InvalidInput(_)) {
            tracing::warn!(code = err.code(), "{}", err);
        } else {
            tracing::error!(code = err.code(), "{}", err);
        }

        let body = ErrorBody {
            code: err.code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}
