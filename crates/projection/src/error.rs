//! Error types for projection operations.

use ecohub_common::{CrsCode, EcohubError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Point ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain { crs: CrsCode, x: f64, y: f64 },

    #[error("Non-finite coordinate ({x}, {y})")]
    NonFinite { x: f64, y: f64 },
}

impl From<ProjectionError> for EcohubError {
    fn from(err: ProjectionError) -> Self {
        EcohubError::InvalidInput(err.to_string())
    }
}
