//! Request body extraction for uploaded areas of interest.

use aoi::{read_upload, VectorDataset};
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use bytes::Bytes;
use ecohub_common::EcohubError;

use crate::error::ApiError;

/// Multipart form field carrying the zipped shapefile.
pub const UPLOAD_FIELD: &str = "shapefile";

/// The uploaded vector data, still encoded.
///
/// Accepts either `multipart/form-data` with a [`UPLOAD_FIELD`] part or a
/// raw body (GeoJSON or a zip archive).
#[derive(Debug)]
pub struct Upload(pub Bytes);

#[async_trait]
impl<S> FromRequest<S> for Upload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        let bytes = if is_multipart {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| invalid(format!("Malformed multipart body: {}", e)))?;
            field_bytes(&mut multipart).await?
        } else {
            Bytes::from_request(req, state)
                .await
                .map_err(|e| invalid(format!("Unreadable request body: {}", e)))?
        };

        if bytes.is_empty() {
            return Err(invalid("Upload is empty".to_string()));
        }
        Ok(Upload(bytes))
    }
}

impl Upload {
    /// Decode the upload off the async runtime.
    pub async fn into_dataset(self) -> Result<VectorDataset, ApiError> {
        let dataset = tokio::task::spawn_blocking(move || read_upload(&self.0))
            .await
            .map_err(|e| EcohubError::Internal(format!("Upload decoding task failed: {}", e)))??;
        Ok(dataset)
    }
}

async fn field_bytes(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| invalid(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| invalid(format!("Failed to read '{}': {}", UPLOAD_FIELD, e)));
        }
    }
    Err(invalid(format!("Missing form field '{}'", UPLOAD_FIELD)))
}

fn invalid(message: String) -> ApiError {
    ApiError(EcohubError::InvalidInput(message))
}
