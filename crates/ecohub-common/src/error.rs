//! Error types for the ecohub extraction pipeline.

use thiserror::Error;

use crate::crs::CrsParseError;
use crate::time::{TemporalKey, TimeParseError};

/// Result type alias using EcohubError.
pub type EcohubResult<T> = Result<T, EcohubError>;

/// Primary error type for extraction operations.
#[derive(Debug, Error)]
pub enum EcohubError {
    // === Input Errors ===
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // === Dependency Errors ===
    #[error("Reference store unavailable: {0}")]
    ReferenceStoreUnavailable(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Transient I/O failure: {0}")]
    TransientIo(String),

    // === Outcome Errors ===
    #[error("No image found for this area.")]
    NoDataFound,

    #[error("Clip for {year} contains no valid pixels")]
    EmptyClip { year: TemporalKey },

    // === Infrastructure Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EcohubError {
    /// Stable machine-readable code, used in API error bodies and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            EcohubError::InvalidInput(_) => "InvalidInput",
            EcohubError::ReferenceStoreUnavailable(_) => "ReferenceStoreUnavailable",
            EcohubError::CatalogUnavailable(_) => "CatalogUnavailable",
            EcohubError::TransientIo(_) => "TransientIo",
            EcohubError::NoDataFound => "NoDataFound",
            EcohubError::EmptyClip { .. } => "EmptyClip",
            EcohubError::Internal(_) => "Internal",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            EcohubError::InvalidInput(_) => 400,
            EcohubError::NoDataFound => 404,
            EcohubError::EmptyClip { .. } => 422,

            EcohubError::ReferenceStoreUnavailable(_) | EcohubError::CatalogUnavailable(_) => 503,
            EcohubError::TransientIo(_) => 504,

            EcohubError::Internal(_) => 500,
        }
    }

    /// Whether the same request may succeed if the caller tries again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EcohubError::ReferenceStoreUnavailable(_)
                | EcohubError::CatalogUnavailable(_)
                | EcohubError::TransientIo(_)
        )
    }

    /// Errors that describe the answer for this AOI rather than a failure.
    pub fn is_user_visible_outcome(&self) -> bool {
        matches!(
            self,
            EcohubError::NoDataFound | EcohubError::EmptyClip { .. }
        )
    }
}

// Conversion from common error types
impl From<std::io::Error> for EcohubError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted => {
                EcohubError::TransientIo(err.to_string())
            }
            _ => EcohubError::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for EcohubError {
    fn from(err: serde_json::Error) -> Self {
        EcohubError::InvalidInput(format!("JSON error: {}", err))
    }
}

impl From<CrsParseError> for EcohubError {
    fn from(err: CrsParseError) -> Self {
        EcohubError::InvalidInput(err.to_string())
    }
}

impl From<TimeParseError> for EcohubError {
    fn from(err: TimeParseError) -> Self {
        EcohubError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(EcohubError::InvalidInput("x".into()).http_status_code(), 400);
        assert_eq!(EcohubError::NoDataFound.http_status_code(), 404);
        assert_eq!(
            EcohubError::EmptyClip {
                year: TemporalKey(2017)
            }
            .http_status_code(),
            422
        );
        assert_eq!(
            EcohubError::CatalogUnavailable("down".into()).http_status_code(),
            503
        );
        assert_eq!(EcohubError::TransientIo("slow".into()).http_status_code(), 504);
    }

    #[test]
    fn test_classification() {
        assert!(EcohubError::TransientIo("t".into()).is_retryable());
        assert!(EcohubError::ReferenceStoreUnavailable("r".into()).is_retryable());
        assert!(!EcohubError::NoDataFound.is_retryable());
        assert!(EcohubError::NoDataFound.is_user_visible_outcome());
        assert!(!EcohubError::Internal("i".into()).is_user_visible_outcome());
    }

    #[test]
    fn test_no_data_message() {
        assert_eq!(
            EcohubError::NoDataFound.to_string(),
            "No image found for this area."
        );
    }
}
