//! Geographic (EPSG:4326) pass-through projection.

use crate::Projection;
use ecohub_common::CrsCode;

/// Identity projection for lon/lat coordinates.
///
/// Longitudes slightly outside [-180, 180] are accepted as they come from
/// datasets crossing the antimeridian; latitudes must be within [-90, 90].
#[derive(Debug, Clone, Copy, Default)]
pub struct Geographic;

impl Projection for Geographic {
    fn crs(&self) -> CrsCode {
        CrsCode::Epsg4326
    }

    fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        valid(lon, lat)
    }

    fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        valid(x, y)
    }
}

fn valid(lon: f64, lat: f64) -> Option<(f64, f64)> {
    if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 || lon.abs() > 540.0 {
        return None;
    }
    Some((lon, lat))
}
