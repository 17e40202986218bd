//! Error types for raster processing.

use ecohub_common::EcohubError;
use projection::ProjectionError;
use thiserror::Error;

/// Errors that can occur while decoding, reprojecting or writing a raster.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The asset is not a GeoTIFF the decoder can read.
    #[error("failed to decode GeoTIFF: {0}")]
    Decode(String),

    /// Failed to encode the output GeoTIFF.
    #[error("failed to encode GeoTIFF: {0}")]
    Encode(String),

    /// Multi-band, rotated or otherwise unsupported layout.
    #[error("unsupported raster layout: {0}")]
    UnsupportedLayout(String),

    /// Neither tiepoint/scale nor a model transformation is present.
    #[error("raster has no georeferencing: {0}")]
    MissingGeoreference(String),

    /// GeoKeys describe a CRS the pipeline cannot place correctly.
    #[error("unsupported raster CRS: {0}")]
    UnsupportedCrs(String),

    /// GeoKeys did not identify a supported CRS and no hint was given.
    #[error("cannot determine raster CRS")]
    UnknownCrs,

    /// The requested window lies entirely outside the raster.
    #[error("raster does not overlap the requested window")]
    NoOverlap,

    /// Output grid would exceed the size limit.
    #[error("output raster of {width}x{height} pixels exceeds the size limit")]
    TooLarge { width: usize, height: usize },

    /// Dimensions and data do not agree.
    #[error("invalid raster: {0}")]
    Invalid(String),

    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tiff::TiffError> for RasterError {
    fn from(err: tiff::TiffError) -> Self {
        RasterError::Decode(err.to_string())
    }
}

impl From<RasterError> for EcohubError {
    fn from(err: RasterError) -> Self {
        match err {
            RasterError::Io(e) => EcohubError::from(e),
            other => EcohubError::Internal(other.to_string()),
        }
    }
}
