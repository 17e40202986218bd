//! Coordinate reference system transformations.
//!
//! Implements the map projections used by uploaded vector data and biomass
//! rasters from scratch, without external dependencies. Every projection maps
//! between geographic lon/lat in degrees (WGS84) and its own x/y plane.

pub mod error;
pub mod geographic;
pub mod mercator;
pub mod sinusoidal;
pub mod transform;
pub mod utm;

pub use error::ProjectionError;
pub use geographic::Geographic;
pub use mercator::WebMercator;
pub use sinusoidal::Sinusoidal;
pub use transform::{projection_for, CrsTransform};
pub use utm::TransverseMercator;

use ecohub_common::CrsCode;

/// A map projection between WGS84 lon/lat (degrees) and projected x/y.
pub trait Projection: Send + Sync {
    /// The CRS whose plane this projection produces.
    fn crs(&self) -> CrsCode;

    /// Geographic lon/lat (degrees) to projected x/y.
    ///
    /// Returns `None` when the point lies outside the projection's domain.
    fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)>;

    /// Projected x/y to geographic lon/lat (degrees).
    fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)>;
}
